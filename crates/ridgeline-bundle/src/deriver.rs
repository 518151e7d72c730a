//! Pure bucket-space state derivation.

use std::collections::{BTreeMap, BTreeSet};

use ridgeline_types::{AnnotatedClusterState, BucketSpace, ClusterState, GenerationReason, NodeId, NodeState, NodeStateTag};

/// Bucket-space-specific facts a [`SpaceDeriver`] may need beyond the
/// baseline itself. Today this is only "which nodes have a global-space
/// merge outstanding"; kept as its own struct so additional derivers can
/// grow their own inputs without changing the `SpaceDeriver` signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivationInputs {
    pub pending_global_merges: BTreeSet<NodeId>,
}

impl DerivationInputs {
    pub fn with_pending_merge(mut self, node: NodeId) -> Self {
        self.pending_global_merges.insert(node);
        self
    }
}

/// A pure function from a baseline state to the derived state for one
/// bucket space.
///
/// Implementations must be deterministic and side-effect free: given the
/// same `baseline` and `inputs`, `derive` always returns the same
/// `AnnotatedClusterState`. Callers rely on two properties holding for
/// every implementation:
/// - `derive(s, inputs).state.version == s.version`
/// - `s1.is_similar_to(s2) ⇒ derive(s1, _).is_similar_to(derive(s2, _))`
pub trait SpaceDeriver: std::fmt::Debug + Send + Sync {
    fn derive(&self, baseline: &ClusterState, inputs: &DerivationInputs) -> AnnotatedClusterState;
}

/// `"default"`: nodes with an outstanding global-space merge are downgraded
/// to [`NodeStateTag::Maintenance`] in the derived state.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSpaceDeriver;

impl SpaceDeriver for DefaultSpaceDeriver {
    fn derive(&self, baseline: &ClusterState, inputs: &DerivationInputs) -> AnnotatedClusterState {
        let mut derived = ClusterState::new(baseline.version, baseline.cluster_flag);
        let mut downgraded_nodes = Vec::new();
        for (id, state) in baseline.nodes() {
            if inputs.pending_global_merges.contains(id) && state.tag == NodeStateTag::Up {
                let downgraded = NodeState::new(NodeStateTag::Maintenance)
                    .with_description("outstanding global-space merge");
                derived.set_node(*id, downgraded);
                downgraded_nodes.push(*id);
            } else {
                derived.set_node(*id, state.clone());
            }
        }
        let mut annotated = AnnotatedClusterState::new(derived, GenerationReason::NoOp);
        for id in downgraded_nodes {
            annotated = annotated.with_node_reason(id, "downgraded: outstanding global-space merge");
        }
        annotated
    }
}

/// `"global"`: identical to the baseline.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalSpaceDeriver;

impl SpaceDeriver for GlobalSpaceDeriver {
    fn derive(&self, baseline: &ClusterState, _inputs: &DerivationInputs) -> AnnotatedClusterState {
        AnnotatedClusterState::new(baseline.clone(), GenerationReason::NoOp)
    }
}

/// A set of [`SpaceDeriver`]s keyed by [`BucketSpace`], built up
/// incrementally via `with_space` -- additional spaces can be added
/// without touching the generator.
#[derive(Debug, Default)]
pub struct DeriverRegistry {
    derivers: BTreeMap<BucketSpace, Box<dyn SpaceDeriver>>,
}

impl DeriverRegistry {
    pub fn new() -> Self {
        Self {
            derivers: BTreeMap::new(),
        }
    }

    /// The canonical two-space registry: `"default"` and `"global"`.
    pub fn standard() -> Self {
        Self::new()
            .with_space(BucketSpace::default_space(), Box::new(DefaultSpaceDeriver))
            .with_space(BucketSpace::global_space(), Box::new(GlobalSpaceDeriver))
    }

    #[must_use]
    pub fn with_space(mut self, space: BucketSpace, deriver: Box<dyn SpaceDeriver>) -> Self {
        self.derivers.insert(space, deriver);
        self
    }

    pub fn has_space(&self, space: &BucketSpace) -> bool {
        self.derivers.contains_key(space)
    }

    pub fn derive(
        &self,
        baseline: &ClusterState,
        space: &BucketSpace,
        inputs: &DerivationInputs,
    ) -> Option<AnnotatedClusterState> {
        self.derivers.get(space).map(|deriver| deriver.derive(baseline, inputs))
    }
}
