//! Node identifiers.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two roles a content node can play in the cluster.
///
/// Ordering is significant: node identifiers are totally ordered by
/// `(NodeType, index)` so that generation and wire encoding are
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Storage,
    Distributor,
}

impl Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Storage => write!(f, "storage"),
            NodeType::Distributor => write!(f, "distributor"),
        }
    }
}

/// Error returned when a [`NodeType`] cannot be parsed from its canonical text.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown node type: {0}")]
pub struct UnknownNodeType(String);

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storage" => Ok(NodeType::Storage),
            "distributor" => Ok(NodeType::Distributor),
            other => Err(UnknownNodeType(other.to_string())),
        }
    }
}

/// `(NodeType, index)`, stable for a node's lifetime in the cluster.
///
/// `index` is a small non-negative integer assigned when a node first joins
/// the cluster's configuration; it is never reused while the cluster lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    node_type: NodeType,
    index: u16,
}

impl NodeId {
    pub fn new(node_type: NodeType, index: u16) -> Self {
        Self { node_type, index }
    }

    pub fn storage(index: u16) -> Self {
        Self::new(NodeType::Storage, index)
    }

    pub fn distributor(index: u16) -> Self {
        Self::new(NodeType::Distributor, index)
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn index(&self) -> u16 {
        self.index
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_type, self.index)
    }
}

/// Error returned when a [`NodeId`] cannot be parsed from its canonical text.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NodeIdParseError {
    #[error("malformed node id: {0}")]
    Malformed(String),
    #[error(transparent)]
    UnknownType(#[from] UnknownNodeType),
    #[error("invalid node index: {0}")]
    InvalidIndex(String),
}

impl FromStr for NodeId {
    type Err = NodeIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_part, index_part) = s
            .split_once('.')
            .ok_or_else(|| NodeIdParseError::Malformed(s.to_string()))?;
        let node_type: NodeType = type_part.parse()?;
        let index: u16 = index_part
            .parse()
            .map_err(|_| NodeIdParseError::InvalidIndex(index_part.to_string()))?;
        Ok(NodeId::new(node_type, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_type_then_index() {
        let a = NodeId::storage(5);
        let b = NodeId::distributor(0);
        // Storage < Distributor regardless of index, per the declared enum order.
        assert!(a < b);
        assert!(NodeId::storage(0) < NodeId::storage(1));
    }

    #[test]
    fn display_and_parse_round_trip() {
        let id = NodeId::distributor(42);
        let text = id.to_string();
        assert_eq!(text, "distributor.42");
        assert_eq!(text.parse::<NodeId>().unwrap(), id);
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert!("widget.0".parse::<NodeId>().is_err());
    }
}
