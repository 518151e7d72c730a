//! Per-node reported/derived state.

use serde::{Deserialize, Serialize};

/// The six states a node can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStateTag {
    Up,
    Down,
    Maintenance,
    Retired,
    Initializing,
    Stopping,
}

impl NodeStateTag {
    /// Single-character code used in the canonical `ClusterState` text form.
    pub fn code(self) -> char {
        match self {
            NodeStateTag::Up => 'u',
            NodeStateTag::Down => 'd',
            NodeStateTag::Maintenance => 'm',
            NodeStateTag::Retired => 'r',
            NodeStateTag::Initializing => 'i',
            NodeStateTag::Stopping => 's',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'u' => Some(NodeStateTag::Up),
            'd' => Some(NodeStateTag::Down),
            'm' => Some(NodeStateTag::Maintenance),
            'r' => Some(NodeStateTag::Retired),
            'i' => Some(NodeStateTag::Initializing),
            's' => Some(NodeStateTag::Stopping),
            _ => None,
        }
    }

    /// Whether `self` is a strictly more restrictive disposition than
    /// `other` for the purposes of ("operator override").
    ///
    /// `Maintenance`, `Retired`, `Down`, and `Stopping` are all considered
    /// more restrictive than `Up`; `Up` is never more restrictive than
    /// anything. This is a partial, conservative ordering -- it only needs
    /// to answer "does the wanted state restrict more than the reported
    /// state", which is the sole use makes of it.
    pub fn is_more_restrictive_than(self, other: Self) -> bool {
        self.restriction_rank() > other.restriction_rank()
    }

    fn restriction_rank(self) -> u8 {
        match self {
            NodeStateTag::Up => 0,
            NodeStateTag::Initializing => 1,
            NodeStateTag::Stopping => 2,
            NodeStateTag::Maintenance => 3,
            NodeStateTag::Retired => 4,
            NodeStateTag::Down => 5,
        }
    }
}

/// A node's disposition, with optional detail fields.
///
/// Two `NodeState`s are [similar](NodeState::is_similar_to) iff they agree on
/// `tag`, ignoring `init_progress` and every other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub tag: NodeStateTag,
    pub description: Option<String>,
    /// Fraction of bucket initialization completed, `0.0..=1.0`.
    pub init_progress: Option<f32>,
    pub min_used_bits: Option<u32>,
    pub capacity: Option<f64>,
}

impl NodeState {
    pub fn new(tag: NodeStateTag) -> Self {
        Self {
            tag,
            description: None,
            init_progress: None,
            min_used_bits: None,
            capacity: None,
        }
    }

    pub fn up() -> Self {
        Self::new(NodeStateTag::Up)
    }

    pub fn down() -> Self {
        Self::new(NodeStateTag::Down)
    }

    pub fn maintenance() -> Self {
        Self::new(NodeStateTag::Maintenance)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_init_progress(mut self, progress: f32) -> Self {
        self.init_progress = Some(progress);
        self
    }

    /// Two node states are similar if they agree on `tag`, ignoring init
    /// progress and any free-text description.
    pub fn is_similar_to(&self, other: &NodeState) -> bool {
        self.tag == other.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_ignores_init_progress_and_detail_fields() {
        let a = NodeState::new(NodeStateTag::Initializing).with_init_progress(0.1);
        let b = NodeState::new(NodeStateTag::Initializing).with_init_progress(0.9);
        assert!(a.is_similar_to(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn similarity_requires_same_tag() {
        let a = NodeState::up();
        let b = NodeState::down();
        assert!(!a.is_similar_to(&b));
    }

    #[test]
    fn code_round_trips() {
        for tag in [
            NodeStateTag::Up,
            NodeStateTag::Down,
            NodeStateTag::Maintenance,
            NodeStateTag::Retired,
            NodeStateTag::Initializing,
            NodeStateTag::Stopping,
        ] {
            assert_eq!(NodeStateTag::from_code(tag.code()), Some(tag));
        }
    }

    #[test]
    fn maintenance_is_more_restrictive_than_up() {
        assert!(NodeStateTag::Maintenance.is_more_restrictive_than(NodeStateTag::Up));
        assert!(!NodeStateTag::Up.is_more_restrictive_than(NodeStateTag::Maintenance));
    }
}
