//! Wire envelope, RPC message shapes, and queue event payloads exchanged
//! between the cluster controller and content nodes.

mod envelope;
mod queue_events;
mod rpc;

pub use envelope::{decode, empty_fallback, encode, BundleEnvelope, EnvelopeError, FeedBlockEnvelope};
pub use queue_events::{ActivationAck, ControllerEvent, ProbeReport, ResourceBlockSignal, WantedStateEdit};
pub use rpc::{
    ActivateSystemStateRequest, ActivateSystemStateResponse, GetNodeStateRequest, GetNodeStateResponse, RpcError,
    SetSystemStateRequest, SetSystemStateResponse,
};
