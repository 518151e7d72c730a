//! The activation coordinator and its pluggable quorum policy.

use std::collections::BTreeMap;

use ridgeline_types::NodeId;
use serde::{Deserialize, Serialize};

/// Which quorum rule gates activation of a deferred bundle. Required, with
/// no `Default` impl -- a caller must pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationQuorumKind {
    /// Activation proceeds once a strict majority of the tracked node set
    /// has staged the version.
    Majority,
    /// Activation proceeds only once every tracked node has staged the
    /// version.
    All,
}

impl ActivationQuorumKind {
    /// Whether `staged` acks out of `total` tracked nodes satisfy this
    /// quorum rule.
    pub fn is_satisfied(self, staged: usize, total: usize) -> bool {
        if total == 0 {
            return true;
        }
        match self {
            ActivationQuorumKind::Majority => staged * 2 > total,
            ActivationQuorumKind::All => staged == total,
        }
    }
}

/// Per-node, per-version staging state the coordinator tracks.
#[derive(Debug, Clone, Default)]
struct PendingActivation {
    staged: BTreeMap<NodeId, u32>,
    activated: bool,
    first_staged_at_ms: Option<u64>,
}

/// Outcome of feeding one tick's acks into the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// Not enough acks yet; nothing to do this tick.
    Pending,
    /// Quorum reached: issue `activate(version)` to every node that has
    /// staged it.
    Ready { version: u32, targets: Vec<NodeId> },
    /// The activation deadline elapsed without quorum; the version stays
    /// pending, and the next generation pass may supersede it.
    TimedOut { version: u32 },
}

/// Tracks staged-but-not-yet-activated bundle versions and decides when a
/// version is activation-ready.
#[derive(Debug)]
pub struct ActivationCoordinator {
    quorum: ActivationQuorumKind,
    deadline_ms: u64,
    pending: BTreeMap<u32, PendingActivation>,
}

impl ActivationCoordinator {
    pub fn new(quorum: ActivationQuorumKind, deadline_ms: u64) -> Self {
        Self {
            quorum,
            deadline_ms,
            pending: BTreeMap::new(),
        }
    }

    /// Begins tracking a freshly published deferred-activation bundle.
    pub fn begin_tracking(&mut self, version: u32) {
        self.pending.entry(version).or_default();
    }

    /// Records a recipient's staging ack.
    pub fn record_ack(&mut self, node_id: NodeId, staged_version: u32, now_ms: u64) {
        let entry = self.pending.entry(staged_version).or_default();
        entry.staged.insert(node_id, staged_version);
        entry.first_staged_at_ms.get_or_insert(now_ms);
        tracing::debug!(node = %node_id, version = staged_version, "recorded activation-stage ack");
    }

    /// Evaluates `version` against the tracked node set and the elapsed
    /// deadline. `tracked_nodes` is the current content-node population.
    pub fn evaluate(&mut self, version: u32, tracked_nodes: usize, now_ms: u64) -> ActivationOutcome {
        let Some(entry) = self.pending.get_mut(&version) else {
            return ActivationOutcome::Pending;
        };
        if entry.activated {
            return ActivationOutcome::Pending;
        }

        if self.quorum.is_satisfied(entry.staged.len(), tracked_nodes) {
            let targets: Vec<NodeId> = entry.staged.keys().copied().collect();
            entry.activated = true;
            return ActivationOutcome::Ready { version, targets };
        }

        if let Some(first_staged_at) = entry.first_staged_at_ms {
            if now_ms.saturating_sub(first_staged_at) > self.deadline_ms {
                return ActivationOutcome::TimedOut { version };
            }
        }

        ActivationOutcome::Pending
    }

    /// Drops bookkeeping for `version`, e.g. once the generator supersedes
    /// it with a newer candidate.
    pub fn forget(&mut self, version: u32) {
        self.pending.remove(&version);
    }
}
