//! Generator configuration.

use std::collections::BTreeSet;

use ridgeline_bundle::BucketSpaceSimilarityPolicy;
use ridgeline_types::BucketSpace;

/// Tunables the [`crate::StateGenerator`] reads every tick.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Below this fraction of distributors reporting `Up`, the top-level
    /// cluster flag is forced to `Down`.
    pub min_distributor_up_ratio: f64,
    /// Same as `min_distributor_up_ratio`, for storage nodes.
    pub min_storage_up_ratio: f64,
    /// Above this many rapid Up→Down transitions, a node is forced `Down`
    /// regardless of its latest report.
    pub premature_crash_limit: u32,
    /// How long (ms) a node may sit in `Initializing` with unchanged
    /// progress before the watchdog treats it as `Down`.
    pub max_init_progress_freeze_ms: u64,
    /// Bucket spaces to derive states for every tick. Empty means baseline-only bundles.
    pub bucket_spaces: BTreeSet<BucketSpace>,
    /// Whether published bundles require explicit `activate(version)`
    /// before taking effect.
    pub deferred_activation: bool,
    /// How `similar_to` treats a bucket space present on one side of the
    /// comparison but absent on the other.
    pub bucket_space_similarity_policy: BucketSpaceSimilarityPolicy,
}

impl GeneratorConfig {
    /// Convenience constructor for tests and examples: permissive ratios,
    /// no bucket spaces, immediate (non-deferred) activation.
    pub fn permissive_for_tests() -> Self {
        Self {
            min_distributor_up_ratio: 0.5,
            min_storage_up_ratio: 0.5,
            premature_crash_limit: 3,
            max_init_progress_freeze_ms: 60_000,
            bucket_spaces: BTreeSet::new(),
            deferred_activation: false,
            bucket_space_similarity_policy: BucketSpaceSimilarityPolicy::TreatMissingAsUnchanged,
        }
    }
}
