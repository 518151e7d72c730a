//! `ControllerConfig`: every runtime-tunable configuration key, plus the
//! two policy choices that have no sensible default (activation quorum
//! rule, bucket-space similarity policy).
//!
//! A plain serde-deserializable struct. Loading from disk is out of scope
//! here; `ControllerConfig` is constructed in-process from already-parsed
//! values.

use std::collections::BTreeSet;

use ridgeline_bundle::BucketSpaceSimilarityPolicy;
use ridgeline_types::BucketSpace;
use serde::{Deserialize, Serialize};

use crate::activation::ActivationQuorumKind;

/// Configuration the controller reads at startup and on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Root path segment under which every cluster's znode tree lives.
    pub root_prefix: String,
    /// Segment in coordination paths.
    pub cluster_name: String,
    /// This replica's controller index, used both for ballots and as a
    /// `NodeId`-adjacent identity in logs.
    pub node_index: u16,
    /// Number of controller replicas voting in elections; the quorum
    /// threshold in `elect_winner` is computed against this count, not the
    /// number of ballots currently observed.
    pub ensemble_size: u16,
    pub session_timeout_ms: u64,
    pub tick_interval_ms: u64,
    pub min_distributor_up_ratio: f64,
    pub min_storage_up_ratio: f64,
    pub premature_crash_limit: u32,
    pub max_init_progress_freeze_ms: u64,
    pub bucket_spaces: BTreeSet<BucketSpace>,
    pub deferred_activation: bool,
    pub reconfigure_per_node_timeout_ms: u64,
    pub reconfigure_min_timeout_ms: u64,

    /// Soft RTT threshold for [`ridgeline_registry::NodeRegistry`]'s
    /// transient-failure classification.
    pub soft_rtt_threshold_ms: u64,
    /// Premature-crash detection window for the same registry.
    pub premature_crash_window_ms: u64,

    /// Which quorum rule gates deferred activation. Required, no default.
    pub activation_quorum: ActivationQuorumKind,
    /// How long the activation coordinator waits for acks before leaving a
    /// version pending for the next tick.
    pub activation_deadline_ms: u64,

    /// How `similar_to` treats a bucket space present on one side of the
    /// comparison but absent on the other.
    pub bucket_space_similarity_policy: BucketSpaceSimilarityPolicy,

    /// How many items to drain from each ingestion queue per tick.
    pub queue_batch_size: usize,
    /// Capacity of each ingestion queue.
    pub queue_capacity: usize,
}

impl ControllerConfig {
    /// A configuration suitable for unit and integration tests: short
    /// timeouts, permissive ratios, majority activation quorum.
    pub fn permissive_for_tests(cluster_name: impl Into<String>, node_index: u16) -> Self {
        Self {
            root_prefix: "ridgeline".to_string(),
            cluster_name: cluster_name.into(),
            node_index,
            ensemble_size: 1,
            session_timeout_ms: 10_000,
            tick_interval_ms: 1_000,
            min_distributor_up_ratio: 0.5,
            min_storage_up_ratio: 0.5,
            premature_crash_limit: 3,
            max_init_progress_freeze_ms: 60_000,
            bucket_spaces: BTreeSet::new(),
            deferred_activation: false,
            reconfigure_per_node_timeout_ms: 500,
            reconfigure_min_timeout_ms: 5_000,
            soft_rtt_threshold_ms: 200,
            premature_crash_window_ms: 10_000,
            activation_quorum: ActivationQuorumKind::Majority,
            activation_deadline_ms: 30_000,
            bucket_space_similarity_policy: BucketSpaceSimilarityPolicy::TreatMissingAsUnchanged,
            queue_batch_size: 64,
            queue_capacity: 1_024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_serde_json() {
        let config = ControllerConfig::permissive_for_tests("prod-east", 0);
        let text = serde_json::to_string(&config).unwrap();
        let back: ControllerConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
