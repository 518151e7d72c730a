//! The merge policy: reported + wanted + timestamps + config → next
//! baseline, then derived bucket-space states.

use std::collections::BTreeMap;

use ridgeline_bundle::{ClusterStateBundle, ClusterStateBundleBuilder, DerivationInputs, DeriverRegistry};
use ridgeline_registry::{NodeInfo, NodeRegistry};
use ridgeline_types::{AnnotatedClusterState, ClusterFlag, ClusterState, FeedBlock, GenerationReason, NodeId, NodeState, NodeStateTag, NodeType};

use crate::config::GeneratorConfig;
use crate::error::GeneratorError;

/// Output of one generation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The candidate was similar to the current bundle; no new version is
    /// needed.
    NoChange,
    /// A new bundle should be published, versioned `current_version + 1`.
    Candidate(ClusterStateBundle),
}

impl GenerationOutcome {
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }

    pub fn into_candidate(self) -> Option<ClusterStateBundle> {
        match self {
            Self::NoChange => None,
            Self::Candidate(bundle) => Some(bundle),
        }
    }
}

/// Why a node's state in the new baseline differs from its raw report, for
/// the per-node reason annotations `AnnotatedClusterState` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverrideReason {
    OperatorOverride,
    PrematureCrashSuppression,
    InitProgressWatchdog,
}

impl OverrideReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::OperatorOverride => "operator override: wanted state more restrictive than reported",
            Self::PrematureCrashSuppression => "premature crash suppression: crash count exceeds limit",
            Self::InitProgressWatchdog => "init progress watchdog: progress frozen past deadline",
        }
    }
}

/// Turns registry state into the next candidate bundle.
///
/// Holds bookkeeping the pure [`ridgeline_bundle::SpaceDeriver`]s cannot:
/// how long each `Initializing` node's progress has sat unchanged, needed
/// for the init-progress watchdog (rule 3). This makes `StateGenerator`
/// itself stateful across ticks, unlike the derivers it calls.
#[derive(Debug)]
pub struct StateGenerator {
    config: GeneratorConfig,
    deriver_registry: DeriverRegistry,
    init_progress_since: BTreeMap<NodeId, (f32, u64)>,
}

impl StateGenerator {
    pub fn new(config: GeneratorConfig, deriver_registry: DeriverRegistry) -> Self {
        Self {
            config,
            deriver_registry,
            init_progress_since: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Runs one generation pass. `merge_pending` feeds the `"default"`
    /// space deriver's "outstanding global-space merges" input; `feed_block`
    /// is stamped onto the candidate unchanged.
    pub fn generate(
        &mut self,
        registry: &NodeRegistry,
        current: &ClusterStateBundle,
        feed_block: Option<FeedBlock>,
        merge_pending: DerivationInputs,
        now_ms: u64,
    ) -> Result<GenerationOutcome, GeneratorError> {
        let next_version = current.version() + 1;
        let mut baseline = ClusterState::new(next_version, ClusterFlag::Up);
        let mut node_reasons = Vec::new();

        for (id, info) in registry.get_all() {
            let (state, reason) = self.resolve_node_state(*id, info, now_ms);
            baseline.set_node(*id, state);
            if let Some(reason) = reason {
                node_reasons.push((*id, reason.as_str()));
            }
        }

        baseline.cluster_flag = Self::compute_cluster_flag(&self.config, &baseline);

        let mut annotated = AnnotatedClusterState::new(
            baseline,
            GenerationReason::Triggered {
                cause: "tick".to_string(),
            },
        );
        for (id, reason) in node_reasons {
            annotated = annotated.with_node_reason(id, reason);
        }

        let candidate = ClusterStateBundleBuilder::new(annotated)
            .with_derived_spaces(self.config.bucket_spaces.clone(), &self.deriver_registry, merge_pending)
            .with_feed_block_opt(feed_block)
            .with_deferred_activation(self.config.deferred_activation)
            .build()?;

        if candidate.similar_to(current, self.config.bucket_space_similarity_policy) {
            tracing::debug!(version = current.version(), "generation produced no change");
            Ok(GenerationOutcome::NoChange)
        } else {
            tracing::debug!(
                old_version = current.version(),
                new_version = candidate.version(),
                "generation produced a new candidate"
            );
            Ok(GenerationOutcome::Candidate(candidate))
        }
    }

    /// Applies the override rules in order -- operator override, premature
    /// crash suppression, init-progress watchdog -- falling through to the
    /// reported state if none fire.
    fn resolve_node_state(&mut self, id: NodeId, info: &NodeInfo, now_ms: u64) -> (NodeState, Option<OverrideReason>) {
        // Rule 1: operator override.
        if info.wanted_state.tag.is_more_restrictive_than(info.reported_state.tag) {
            self.init_progress_since.remove(&id);
            return (info.wanted_state.clone(), Some(OverrideReason::OperatorOverride));
        }

        // Rule 2: premature crash suppression.
        if info.premature_crash_count > self.config.premature_crash_limit {
            self.init_progress_since.remove(&id);
            let state = NodeState::down().with_description("premature crash suppression");
            return (state, Some(OverrideReason::PrematureCrashSuppression));
        }

        // Rule 3: init progress watchdog.
        if info.reported_state.tag == NodeStateTag::Initializing {
            if let Some(progress) = info.reported_state.init_progress {
                let frozen = match self.init_progress_since.get(&id) {
                    Some((last_progress, since)) if (*last_progress - progress).abs() <= f32::EPSILON => {
                        now_ms.saturating_sub(*since) > self.config.max_init_progress_freeze_ms
                    }
                    _ => false,
                };
                if frozen {
                    return (
                        NodeState::down().with_description("init progress frozen"),
                        Some(OverrideReason::InitProgressWatchdog),
                    );
                }
                self.init_progress_since
                    .entry(id)
                    .and_modify(|(last_progress, since)| {
                        if (*last_progress - progress).abs() > f32::EPSILON {
                            *last_progress = progress;
                            *since = now_ms;
                        }
                    })
                    .or_insert((progress, now_ms));
            } else {
                self.init_progress_since.remove(&id);
            }
        } else {
            self.init_progress_since.remove(&id);
        }

        // Rule 4: reported state wins.
        (info.reported_state.clone(), None)
    }

    /// Rule 5: global up-ratio floor.
    fn compute_cluster_flag(config: &GeneratorConfig, baseline: &ClusterState) -> ClusterFlag {
        let storage_ratio = Self::up_ratio(baseline, NodeType::Storage);
        let distributor_ratio = Self::up_ratio(baseline, NodeType::Distributor);

        if storage_ratio < config.min_storage_up_ratio || distributor_ratio < config.min_distributor_up_ratio {
            ClusterFlag::Down
        } else {
            ClusterFlag::Up
        }
    }

    fn up_ratio(baseline: &ClusterState, node_type: NodeType) -> f64 {
        let mut total = 0u32;
        let mut up = 0u32;
        for (id, state) in baseline.nodes() {
            if id.node_type() == node_type {
                total += 1;
                if state.tag == NodeStateTag::Up {
                    up += 1;
                }
            }
        }
        if total == 0 {
            1.0
        } else {
            f64::from(up) / f64::from(total)
        }
    }
}
