//! The `NodeInfo` registry: the controller thread's single source of truth
//! for per-node reported/wanted state.
//!
//! Exclusively owned and mutated by the controller thread; no
//! internal locking. Removal happens only on configuration change, never as
//! a side effect of a tick.

use std::collections::BTreeMap;

use ridgeline_types::{NodeId, NodeState, NodeStateTag};

/// Per-node mutable bookkeeping the generator reads every tick.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Operator intent; takes precedence over `reported_state` when more
    /// restrictive.
    pub wanted_state: NodeState,
    /// Last probe outcome.
    pub reported_state: NodeState,
    /// Monotonic timestamp (ms) from the last time this node was seen
    /// starting, i.e. transitioning into `Up`. Used for premature-crash
    /// detection.
    pub start_timestamp: u64,
    /// Count of Up→Down transitions observed inside the premature-crash
    /// policy window; reset after a stable Up period.
    pub premature_crash_count: u32,
    /// Most recently observed probe round-trip time, if any.
    pub last_probe_rtt_ms: Option<u64>,
    /// Count of probes whose RTT exceeded the soft threshold without a hard
    /// failure.
    pub transient_failures: u32,
}

impl NodeInfo {
    fn new(now_ms: u64) -> Self {
        Self {
            wanted_state: NodeState::up(),
            reported_state: NodeState::up(),
            start_timestamp: now_ms,
            premature_crash_count: 0,
            last_probe_rtt_ms: None,
            transient_failures: 0,
        }
    }
}

/// Registry of [`NodeInfo`], keyed by [`NodeId`], iterated in
/// `(NodeType, index)` order so the generator's node iteration is
/// deterministic.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeId, NodeInfo>,
    /// Window (ms) inside which an Up→Down transition counts as a
    /// premature crash, and the duration of stable Up time after which the
    /// crash counter resets.
    premature_crash_window_ms: u64,
    /// RTT (ms) above which a probe counts as a transient failure without
    /// moving `reported_state`.
    soft_rtt_threshold_ms: u64,
}

impl NodeRegistry {
    pub fn new(premature_crash_window_ms: u64, soft_rtt_threshold_ms: u64) -> Self {
        Self {
            nodes: BTreeMap::new(),
            premature_crash_window_ms,
            soft_rtt_threshold_ms,
        }
    }

    /// Creates a `NodeInfo` for `id` if this is the first time it has been
    /// observed, defaulting both wanted and reported state to `Up`.
    pub fn ensure_node(&mut self, id: NodeId, now_ms: u64) -> &mut NodeInfo {
        self.nodes.entry(id).or_insert_with(|| NodeInfo::new(now_ms))
    }

    /// Removes `id` from the registry. Only called on configuration change.
    pub fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeInfo> {
        self.nodes.get(&id)
    }

    pub fn get_all(&self) -> impl Iterator<Item = (&NodeId, &NodeInfo)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records an operator edit to a node's wanted state.
    pub fn set_wanted(&mut self, id: NodeId, wanted: NodeState, now_ms: u64) {
        self.ensure_node(id, now_ms).wanted_state = wanted;
    }

    /// Records a probe outcome. Updates `last_probe_rtt_ms`, bumps
    /// `transient_failures` when `rtt_ms` exceeds the soft threshold, runs
    /// premature-crash bookkeeping on an Up→Down transition, and resets the
    /// crash counter after a stable Up period.
    pub fn record_report(&mut self, id: NodeId, reported: NodeState, rtt_ms: u64, now_ms: u64) {
        let window = self.premature_crash_window_ms;
        let soft_threshold = self.soft_rtt_threshold_ms;
        let info = self.ensure_node(id, now_ms);

        info.last_probe_rtt_ms = Some(rtt_ms);
        if rtt_ms > soft_threshold {
            info.transient_failures = info.transient_failures.saturating_add(1);
            tracing::debug!(node = %id, rtt_ms, "probe RTT exceeded soft threshold");
        }

        let was_up = info.reported_state.tag == NodeStateTag::Up;
        let became_down = reported.tag == NodeStateTag::Down;
        if was_up && became_down && now_ms.saturating_sub(info.start_timestamp) < window {
            info.premature_crash_count = info.premature_crash_count.saturating_add(1);
            tracing::warn!(node = %id, count = info.premature_crash_count, "premature crash detected");
        }

        let became_up = !was_up && reported.tag == NodeStateTag::Up;
        if became_up {
            info.start_timestamp = now_ms;
        } else if reported.tag == NodeStateTag::Up
            && now_ms.saturating_sub(info.start_timestamp) >= window
            && info.premature_crash_count > 0
        {
            tracing::debug!(node = %id, "stable Up period reached, resetting premature crash count");
            info.premature_crash_count = 0;
        }

        info.reported_state = reported;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW_MS: u64 = 10_000;
    const RTT_THRESHOLD_MS: u64 = 200;

    fn registry() -> NodeRegistry {
        NodeRegistry::new(WINDOW_MS, RTT_THRESHOLD_MS)
    }

    #[test]
    fn first_observation_defaults_to_up() {
        let mut reg = registry();
        let info = reg.ensure_node(NodeId::storage(0), 0);
        assert_eq!(info.reported_state.tag, NodeStateTag::Up);
        assert_eq!(info.wanted_state.tag, NodeStateTag::Up);
    }

    #[test]
    fn set_wanted_persists() {
        let mut reg = registry();
        reg.set_wanted(NodeId::storage(0), NodeState::maintenance(), 0);
        assert_eq!(reg.get(NodeId::storage(0)).unwrap().wanted_state.tag, NodeStateTag::Maintenance);
    }

    #[test]
    fn get_all_iterates_in_node_id_order() {
        let mut reg = registry();
        reg.ensure_node(NodeId::distributor(0), 0);
        reg.ensure_node(NodeId::storage(5), 0);
        reg.ensure_node(NodeId::storage(0), 0);
        let ids: Vec<_> = reg.get_all().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![NodeId::storage(0), NodeId::storage(5), NodeId::distributor(0)]);
    }

    #[test]
    fn rapid_up_to_down_inside_window_counts_as_premature_crash() {
        let mut reg = registry();
        reg.record_report(NodeId::storage(0), NodeState::up(), 0, 0);
        reg.record_report(NodeId::storage(0), NodeState::down(), 0, 1_000);
        assert_eq!(reg.get(NodeId::storage(0)).unwrap().premature_crash_count, 1);
    }

    #[test]
    fn up_to_down_outside_window_does_not_count() {
        let mut reg = registry();
        reg.record_report(NodeId::storage(0), NodeState::up(), 0, 0);
        reg.record_report(NodeId::storage(0), NodeState::down(), 0, WINDOW_MS + 1);
        assert_eq!(reg.get(NodeId::storage(0)).unwrap().premature_crash_count, 0);
    }

    #[test]
    fn stable_up_period_resets_crash_count() {
        let mut reg = registry();
        reg.record_report(NodeId::storage(0), NodeState::up(), 0, 0);
        reg.record_report(NodeId::storage(0), NodeState::down(), 0, 500);
        reg.record_report(NodeId::storage(0), NodeState::up(), 0, 600);
        assert_eq!(reg.get(NodeId::storage(0)).unwrap().premature_crash_count, 1);
        // Stays up past the window without crashing again.
        reg.record_report(NodeId::storage(0), NodeState::up(), 0, 600 + WINDOW_MS + 1);
        assert_eq!(reg.get(NodeId::storage(0)).unwrap().premature_crash_count, 0);
    }

    #[test]
    fn high_rtt_counts_as_transient_failure_without_moving_reported_state() {
        let mut reg = registry();
        reg.record_report(NodeId::storage(0), NodeState::up(), RTT_THRESHOLD_MS + 50, 0);
        let info = reg.get(NodeId::storage(0)).unwrap();
        assert_eq!(info.transient_failures, 1);
        assert_eq!(info.reported_state.tag, NodeStateTag::Up);
    }
}
