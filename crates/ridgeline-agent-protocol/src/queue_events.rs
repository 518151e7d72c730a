//! Payloads carried on the four controller-thread ingestion queues named
//! in ("Concurrency & Resource Model"): `ProbeReport`,
//! `WantedStateEdit`, `ResourceBlockSignal`, `ActivationAck`.
//!
//! Modeled on `kmb_agent_protocol::AgentMessage` /
//! `ControlMessage` style of giving every message kind its own concrete,
//! serializable struct rather than passing tuples or `serde_json::Value`
//! around.

use std::time::Duration;

use ridgeline_types::{NodeId, NodeState};
use serde::{Deserialize, Serialize};

/// A probe outcome from the node-probe collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub node_id: NodeId,
    pub reported_state: NodeState,
    pub rtt: Duration,
    /// Milliseconds since epoch when the probe completed.
    pub observed_at_ms: u64,
}

impl ProbeReport {
    pub fn new(node_id: NodeId, reported_state: NodeState, rtt: Duration, observed_at_ms: u64) -> Self {
        Self {
            node_id,
            reported_state,
            rtt,
            observed_at_ms,
        }
    }
}

/// An operator edit to a node's wanted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WantedStateEdit {
    pub node_id: NodeId,
    pub wanted_state: NodeState,
}

impl WantedStateEdit {
    pub fn new(node_id: NodeId, wanted_state: NodeState) -> Self {
        Self { node_id, wanted_state }
    }
}

/// A cluster-wide feed-block request from the resource-usage observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBlockSignal {
    pub block: bool,
    pub description: String,
}

impl ResourceBlockSignal {
    pub fn new(block: bool, description: impl Into<String>) -> Self {
        Self {
            block,
            description: description.into(),
        }
    }
}

/// A recipient's acknowledgment that it has staged a bundle version,
/// consumed by the activation coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationAck {
    pub node_id: NodeId,
    pub staged_version: u32,
}

impl ActivationAck {
    pub fn new(node_id: NodeId, staged_version: u32) -> Self {
        Self { node_id, staged_version }
    }
}

/// Any one of the four queue event kinds, for call sites (e.g. a single
/// bounded channel feeding the controller thread) that want one sum type
/// rather than four separate queues. The controller itself still drains
/// per-kind queues as describes; this exists for collaborators
/// that multiplex before handing events to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControllerEvent {
    Probe(ProbeReport),
    WantedState(WantedStateEdit),
    ResourceBlock(ResourceBlockSignal),
    Activation(ActivationAck),
}
