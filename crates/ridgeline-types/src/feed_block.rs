//! Cluster-wide feed-block signal.

use serde::{Deserialize, Serialize};

/// Instructs content nodes to refuse client writes while still allowing
/// internal maintenance traffic.
///
/// Immutable once constructed; equality is field-wise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedBlock {
    pub block_feed_in_cluster: bool,
    pub description: String,
}

impl FeedBlock {
    pub fn new(block_feed_in_cluster: bool, description: impl Into<String>) -> Self {
        Self {
            block_feed_in_cluster,
            description: description.into(),
        }
    }

    pub fn blocked(description: impl Into<String>) -> Self {
        Self::new(true, description)
    }

    /// `true` iff client writes are cluster-blocked. An absent `FeedBlock`
    /// (modeled elsewhere as `Option<FeedBlock>`) is equivalent to this
    /// being `false`: internal maintenance traffic is always allowed, and
    /// so is feed when there is no active block.
    pub fn is_blocking(&self) -> bool {
        self.block_feed_in_cluster
    }
}
