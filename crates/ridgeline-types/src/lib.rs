//! Core node and cluster-state value types for the Ridgeline cluster
//! controller.
//!
//! Every public type here is plain data: no I/O, no clocks, no global state.
//! `ridgeline-bundle`, `ridgeline-registry`, and `ridgeline-generator` build
//! their logic on top of these types; `ridgeline-coordination` serializes
//! them onto the wire via [`codec`].

mod bucket_space;
mod cluster_state;
pub mod codec;
mod feed_block;
mod node_id;
mod node_state;

pub use bucket_space::BucketSpace;
pub use cluster_state::{AnnotatedClusterState, ClusterFlag, ClusterState, GenerationReason};
pub use feed_block::FeedBlock;
pub use node_id::{NodeId, NodeIdParseError, NodeType, UnknownNodeType};
pub use node_state::{NodeState, NodeStateTag};
