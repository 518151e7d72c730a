//! Versioned, ordered cluster-wide state.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::node_id::NodeId;
use crate::node_state::NodeState;

/// Whether the cluster as a whole accepts client traffic, independent of any
/// per-bucket-space [`crate::FeedBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterFlag {
    Up,
    Down,
}

impl ClusterFlag {
    pub fn code(self) -> char {
        match self {
            ClusterFlag::Up => 'u',
            ClusterFlag::Down => 'd',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'u' => Some(ClusterFlag::Up),
            'd' => Some(ClusterFlag::Down),
            _ => None,
        }
    }
}

impl Display for ClusterFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single version of the cluster's derived state: a cluster-wide flag plus
/// an ordered map of every known node's disposition.
///
/// `NodeId → NodeState` is kept in a `BTreeMap` so that encoding, hashing,
/// and similarity comparisons are deterministic regardless of insertion
/// order -- the generator always iterates nodes in `(NodeType, index)`
/// order, and this type's natural iteration order matches that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterState {
    pub version: u32,
    pub cluster_flag: ClusterFlag,
    nodes: BTreeMap<NodeId, NodeState>,
}

impl ClusterState {
    pub fn new(version: u32, cluster_flag: ClusterFlag) -> Self {
        Self {
            version,
            cluster_flag,
            nodes: BTreeMap::new(),
        }
    }

    pub fn with_node(mut self, id: NodeId, state: NodeState) -> Self {
        self.nodes.insert(id, state);
        self
    }

    pub fn set_node(&mut self, id: NodeId, state: NodeState) {
        self.nodes.insert(id, state);
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeState)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns a clone with `version` replaced, leaving every node entry
    /// untouched. Used when a bundle's derived state is unchanged but the
    /// baseline version still advances.
    #[must_use]
    pub fn with_version(&self, version: u32) -> Self {
        let mut clone = self.clone();
        clone.version = version;
        clone
    }

    /// Two `ClusterState`s are similar iff they agree on `cluster_flag`, have
    /// the same set of node ids, and each pair of node states is
    /// [similar](NodeState::is_similar_to).
    pub fn is_similar_to(&self, other: &ClusterState) -> bool {
        if self.cluster_flag != other.cluster_flag {
            return false;
        }
        if self.nodes.len() != other.nodes.len() {
            return false;
        }
        self.nodes.iter().all(|(id, state)| {
            other
                .nodes
                .get(id)
                .is_some_and(|other_state| state.is_similar_to(other_state))
        })
    }
}

/// The reason a [`ClusterState`] was (re)generated, attached for operator
/// visibility but never considered when deciding whether a new version is
/// needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationReason {
    /// Produced directly from a probe report or wanted-state edit.
    Triggered { cause: String },
    /// Re-derived with no observed change; exists only to record that the
    /// generator ran.
    NoOp,
}

/// A [`ClusterState`] together with the reasons it holds the shape it does.
///
/// `per_node_reasons` is best-effort operator diagnostics (e.g. "why is
/// storage.3 Down") and, like `reason`, is excluded from similarity and
/// equality-for-publication decisions -- only the wrapped `state` matters
/// there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedClusterState {
    pub state: ClusterState,
    pub reason: GenerationReason,
    pub per_node_reasons: BTreeMap<NodeId, String>,
}

impl AnnotatedClusterState {
    pub fn new(state: ClusterState, reason: GenerationReason) -> Self {
        Self {
            state,
            reason,
            per_node_reasons: BTreeMap::new(),
        }
    }

    pub fn with_node_reason(mut self, id: NodeId, reason: impl Into<String>) -> Self {
        self.per_node_reasons.insert(id, reason.into());
        self
    }

    /// Delegates to [`ClusterState::is_similar_to`]; annotations never
    /// participate.
    pub fn is_similar_to(&self, other: &AnnotatedClusterState) -> bool {
        self.state.is_similar_to(&other.state)
    }
}
