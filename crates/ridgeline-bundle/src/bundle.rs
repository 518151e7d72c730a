//! `ClusterStateBundle`: the immutable, published composite.

use std::collections::{BTreeMap, BTreeSet};

use ridgeline_types::{AnnotatedClusterState, BucketSpace, ClusterState, FeedBlock};

use crate::deriver::{DerivationInputs, DeriverRegistry};
use crate::error::BundleError;

/// Whether a bucket space present in one bundle but absent in the other
/// counts toward `similar_to`.
///
/// `TreatMissingAsUnchanged` is the default, to avoid forcing a new
/// version purely because a deployment added or dropped a bucket space.
/// `TreatMissingAsChanged` forces a new version whenever the derived
/// bucket-space *set* differs, not just its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketSpaceSimilarityPolicy {
    TreatMissingAsUnchanged,
    TreatMissingAsChanged,
}

impl Default for BucketSpaceSimilarityPolicy {
    fn default() -> Self {
        Self::TreatMissingAsUnchanged
    }
}

/// The published composite: baseline view, per-bucket-space derived views,
/// a cluster-wide feed-block signal, and whether activation is deferred.
///
/// Immutable once built. `version()` is always `baseline.state.version`;
/// every entry in `derived` is guaranteed (by construction, see
/// [`ClusterStateBundleBuilder::build`]) to share that version.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStateBundle {
    baseline: AnnotatedClusterState,
    derived: BTreeMap<BucketSpace, AnnotatedClusterState>,
    feed_block: Option<FeedBlock>,
    deferred_activation: bool,
}

impl ClusterStateBundle {
    pub fn version(&self) -> u32 {
        self.baseline.state.version
    }

    pub fn baseline(&self) -> &AnnotatedClusterState {
        &self.baseline
    }

    pub fn derived(&self) -> &BTreeMap<BucketSpace, AnnotatedClusterState> {
        &self.derived
    }

    pub fn feed_block(&self) -> Option<&FeedBlock> {
        self.feed_block.as_ref()
    }

    /// Whether client writes are blocked cluster-wide right now. Absent
    /// `feed_block`, or one that isn't itself blocking, both mean feed is
    /// allowed.
    pub fn is_feed_blocked(&self) -> bool {
        self.feed_block.as_ref().is_some_and(FeedBlock::is_blocking)
    }

    pub fn deferred_activation(&self) -> bool {
        self.deferred_activation
    }

    /// Deep-clones the bundle, applying `f` to the baseline and every
    /// derived state. Feed-block and deferred-activation pass through
    /// unchanged.
    #[must_use]
    pub fn clone_with_mapper(&self, f: impl Fn(&ClusterState) -> ClusterState) -> Self {
        let baseline = AnnotatedClusterState {
            state: f(&self.baseline.state),
            reason: self.baseline.reason.clone(),
            per_node_reasons: self.baseline.per_node_reasons.clone(),
        };
        let derived = self
            .derived
            .iter()
            .map(|(space, annotated)| {
                let mapped = AnnotatedClusterState {
                    state: f(&annotated.state),
                    reason: annotated.reason.clone(),
                    per_node_reasons: annotated.per_node_reasons.clone(),
                };
                (space.clone(), mapped)
            })
            .collect();
        Self {
            baseline,
            derived,
            feed_block: self.feed_block.clone(),
            deferred_activation: self.deferred_activation,
        }
    }

    /// Convenience over [`clone_with_mapper`](Self::clone_with_mapper) that
    /// only rewrites every contained `ClusterState`'s version.
    #[must_use]
    pub fn cloned_with_version_set(&self, version: u32) -> Self {
        self.clone_with_mapper(|state| state.with_version(version))
    }

    /// Two bundles are similar iff their baselines are similar, their
    /// feed-block *cluster* flags agree, and every derived entry present in
    /// both is similar -- entries present on only one side are handled per
    /// `policy`.
    ///
    /// `similar_to == true` implies a new version is not required.
    pub fn similar_to(&self, other: &Self, policy: BucketSpaceSimilarityPolicy) -> bool {
        if !self.baseline.is_similar_to(&other.baseline) {
            return false;
        }
        if self.is_feed_blocked() != other.is_feed_blocked() {
            return false;
        }

        match policy {
            BucketSpaceSimilarityPolicy::TreatMissingAsUnchanged => {
                self.derived.iter().all(|(space, annotated)| {
                    other
                        .derived
                        .get(space)
                        .is_none_or(|other_annotated| annotated.is_similar_to(other_annotated))
                }) && other.derived.iter().all(|(space, annotated)| {
                    self.derived
                        .get(space)
                        .is_none_or(|self_annotated| annotated.is_similar_to(self_annotated))
                })
            }
            BucketSpaceSimilarityPolicy::TreatMissingAsChanged => {
                self.derived.keys().eq(other.derived.keys())
                    && self.derived.iter().all(|(space, annotated)| {
                        other
                            .derived
                            .get(space)
                            .is_some_and(|other_annotated| annotated.is_similar_to(other_annotated))
                    })
            }
        }
    }
}

/// Builds a [`ClusterStateBundle`].
///
/// `explicit_derived` and `derive_spec` are mutually exclusive: setting both
/// and calling [`build`](Self::build) fails with
/// [`BundleError::InvalidBuilderUsage`]. They are tracked as two
/// separate optional fields, rather than one tagged enum, specifically so
/// that "caller set both" is representable and can be rejected at `build`
/// time instead of silently letting the second call win.
pub struct ClusterStateBundleBuilder<'a> {
    baseline: AnnotatedClusterState,
    explicit_derived: Option<BTreeMap<BucketSpace, AnnotatedClusterState>>,
    derive_spec: Option<(BTreeSet<BucketSpace>, &'a DeriverRegistry, DerivationInputs)>,
    feed_block: Option<FeedBlock>,
    deferred_activation: bool,
}

impl<'a> ClusterStateBundleBuilder<'a> {
    pub fn new(baseline: AnnotatedClusterState) -> Self {
        Self {
            baseline,
            explicit_derived: None,
            derive_spec: None,
            feed_block: None,
            deferred_activation: false,
        }
    }

    /// Supplies derived states directly. Mutually exclusive with
    /// [`with_derived_spaces`](Self::with_derived_spaces).
    #[must_use]
    pub fn with_explicit_derived(mut self, derived: BTreeMap<BucketSpace, AnnotatedClusterState>) -> Self {
        self.explicit_derived = Some(derived);
        self
    }

    /// Requests that derived states be computed for `spaces` via
    /// `registry`. Mutually exclusive with
    /// [`with_explicit_derived`](Self::with_explicit_derived).
    #[must_use]
    pub fn with_derived_spaces(
        mut self,
        spaces: BTreeSet<BucketSpace>,
        registry: &'a DeriverRegistry,
        inputs: DerivationInputs,
    ) -> Self {
        self.derive_spec = Some((spaces, registry, inputs));
        self
    }

    #[must_use]
    pub fn with_feed_block(mut self, feed_block: FeedBlock) -> Self {
        self.feed_block = Some(feed_block);
        self
    }

    #[must_use]
    pub fn with_feed_block_opt(mut self, feed_block: Option<FeedBlock>) -> Self {
        self.feed_block = feed_block;
        self
    }

    #[must_use]
    pub fn with_deferred_activation(mut self, deferred_activation: bool) -> Self {
        self.deferred_activation = deferred_activation;
        self
    }

    /// Finishes the bundle. Fails with
    /// [`BundleError::InvalidBuilderUsage`] if both derived-state options
    /// were supplied, with [`BundleError::UnknownBucketSpace`] if a
    /// requested space has no registered deriver, and with
    /// [`BundleError::DerivedVersionMismatch`] if an explicitly supplied
    /// derived state disagrees with the baseline's version.
    pub fn build(self) -> Result<ClusterStateBundle, BundleError> {
        let baseline_version = self.baseline.state.version;

        let derived = match (self.explicit_derived, self.derive_spec) {
            (Some(_), Some(_)) => return Err(BundleError::InvalidBuilderUsage),
            (None, None) => BTreeMap::new(),
            (Some(derived), None) => {
                for (space, annotated) in &derived {
                    if annotated.state.version != baseline_version {
                        return Err(BundleError::DerivedVersionMismatch {
                            space: space.clone(),
                            expected: baseline_version,
                            found: annotated.state.version,
                        });
                    }
                }
                derived
            }
            (None, Some((spaces, registry, inputs))) => {
                let mut derived = BTreeMap::new();
                for space in spaces {
                    let annotated = registry
                        .derive(&self.baseline.state, &space, &inputs)
                        .ok_or_else(|| BundleError::UnknownBucketSpace(space.clone()))?;
                    derived.insert(space, annotated);
                }
                derived
            }
        };

        Ok(ClusterStateBundle {
            baseline: self.baseline,
            derived,
            feed_block: self.feed_block,
            deferred_activation: self.deferred_activation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_types::{ClusterFlag, GenerationReason, NodeId, NodeState, NodeStateTag};

    fn baseline(version: u32) -> AnnotatedClusterState {
        let state = ClusterState::new(version, ClusterFlag::Up).with_node(NodeId::storage(0), NodeState::up());
        AnnotatedClusterState::new(state, GenerationReason::NoOp)
    }

    #[test]
    fn baseline_only_bundle_has_empty_derived_map() {
        let bundle = ClusterStateBundleBuilder::new(baseline(1)).build().unwrap();
        assert!(bundle.derived().is_empty());
        assert_eq!(bundle.version(), 1);
    }

    #[test]
    fn derives_one_state_per_requested_space() {
        let registry = DeriverRegistry::standard();
        let spaces: BTreeSet<_> = [BucketSpace::default_space(), BucketSpace::global_space()]
            .into_iter()
            .collect();
        let bundle = ClusterStateBundleBuilder::new(baseline(5))
            .with_derived_spaces(spaces, &registry, DerivationInputs::default())
            .build()
            .unwrap();
        assert_eq!(bundle.derived().len(), 2);
        for annotated in bundle.derived().values() {
            assert_eq!(annotated.state.version, 5);
        }
    }

    #[test]
    fn unknown_bucket_space_is_an_error() {
        let registry = DeriverRegistry::standard();
        let spaces: BTreeSet<_> = [BucketSpace::new("exotic")].into_iter().collect();
        let err = ClusterStateBundleBuilder::new(baseline(1))
            .with_derived_spaces(spaces, &registry, DerivationInputs::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, BundleError::UnknownBucketSpace(space) if space.as_str() == "exotic"));
    }

    #[test]
    fn explicit_derived_must_match_baseline_version() {
        let mut mismatched = BTreeMap::new();
        mismatched.insert(BucketSpace::default_space(), baseline(2));
        let err = ClusterStateBundleBuilder::new(baseline(1))
            .with_explicit_derived(mismatched)
            .build()
            .unwrap_err();
        assert!(matches!(err, BundleError::DerivedVersionMismatch { expected: 1, found: 2, .. }));
    }

    #[test]
    fn cloned_with_version_set_round_trips() {
        let registry = DeriverRegistry::standard();
        let spaces: BTreeSet<_> = [BucketSpace::default_space()].into_iter().collect();
        let bundle = ClusterStateBundleBuilder::new(baseline(1))
            .with_derived_spaces(spaces, &registry, DerivationInputs::default())
            .build()
            .unwrap();
        let bumped = bundle.cloned_with_version_set(7);
        assert_eq!(bumped.version(), 7);
        let back = bumped.cloned_with_version_set(1);
        assert_eq!(back, bundle);
    }

    #[test]
    fn similar_to_is_reflexive() {
        let bundle = ClusterStateBundleBuilder::new(baseline(1)).build().unwrap();
        assert!(bundle.similar_to(&bundle, BucketSpaceSimilarityPolicy::TreatMissingAsUnchanged));
    }

    #[test]
    fn similar_to_ignores_init_progress_only() {
        let a_state = ClusterState::new(1, ClusterFlag::Up)
            .with_node(NodeId::storage(0), NodeState::new(NodeStateTag::Initializing).with_init_progress(0.1));
        let b_state = ClusterState::new(2, ClusterFlag::Up)
            .with_node(NodeId::storage(0), NodeState::new(NodeStateTag::Initializing).with_init_progress(0.9));
        let a = ClusterStateBundleBuilder::new(AnnotatedClusterState::new(a_state, GenerationReason::NoOp))
            .build()
            .unwrap();
        let b = ClusterStateBundleBuilder::new(AnnotatedClusterState::new(b_state, GenerationReason::NoOp))
            .build()
            .unwrap();
        assert!(a.similar_to(&b, BucketSpaceSimilarityPolicy::TreatMissingAsUnchanged));
    }

    #[test]
    fn feed_block_cluster_flag_mismatch_breaks_similarity() {
        let a = ClusterStateBundleBuilder::new(baseline(1)).build().unwrap();
        let b = ClusterStateBundleBuilder::new(baseline(1))
            .with_feed_block(FeedBlock::blocked("disk full"))
            .build()
            .unwrap();
        assert!(!a.similar_to(&b, BucketSpaceSimilarityPolicy::TreatMissingAsUnchanged));
    }

    #[test]
    fn setting_both_derived_options_is_invalid_builder_usage() {
        let registry = DeriverRegistry::standard();
        let spaces: BTreeSet<_> = [BucketSpace::default_space()].into_iter().collect();
        let err = ClusterStateBundleBuilder::new(baseline(1))
            .with_explicit_derived(BTreeMap::new())
            .with_derived_spaces(spaces, &registry, DerivationInputs::default())
            .build()
            .unwrap_err();
        assert_eq!(err, BundleError::InvalidBuilderUsage);
    }

    #[test]
    fn missing_bucket_space_policy_changes_similarity_verdict() {
        let registry = DeriverRegistry::standard();
        let with_default: BTreeSet<_> = [BucketSpace::default_space()].into_iter().collect();
        let a = ClusterStateBundleBuilder::new(baseline(1))
            .with_derived_spaces(with_default, &registry, DerivationInputs::default())
            .build()
            .unwrap();
        let b = ClusterStateBundleBuilder::new(baseline(1)).build().unwrap();

        assert!(a.similar_to(&b, BucketSpaceSimilarityPolicy::TreatMissingAsUnchanged));
        assert!(!a.similar_to(&b, BucketSpaceSimilarityPolicy::TreatMissingAsChanged));
    }
}
