//! RPC request/response shapes exchanged with content nodes.
//!
//! The transport itself is not
//! modeled here -- only the message shapes and the errors a caller can
//! observe from a `setSystemState` exchange.

use ridgeline_types::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::BundleEnvelope;

/// Sends a serialized bundle to a recipient; retried per node with
/// exponential backoff by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSystemStateRequest {
    pub bundle: BundleEnvelope,
}

/// The recipient's staged version in response to `setSystemState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSystemStateResponse {
    pub staged_version: u32,
}

/// Instructs a recipient to activate a previously staged version;
/// idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateSystemStateRequest {
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateSystemStateResponse {
    pub activated_version: u32,
}

/// Long-poll probe request used by the node-probe collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetNodeStateRequest {
    /// The version the prober already holds; the recipient may long-poll
    /// until its state differs from this, or until its own deadline
    /// elapses.
    pub expected_version: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetNodeStateResponse {
    pub current_version: u32,
}

/// Errors a caller can observe from an RPC exchange with a content node
///").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("node {node_id} did not respond before the deadline")]
    Timeout { node_id: NodeId },
    #[error("node {node_id} returned a malformed response: {detail}")]
    ProtocolViolation { node_id: NodeId, detail: String },
    #[error("transport error contacting {node_id}: {detail}")]
    Transport { node_id: NodeId, detail: String },
}
