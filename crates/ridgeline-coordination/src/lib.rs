//! Coordination client trait, errors, znode layout, and an in-memory test
//! double for the external ordered-log ("ZK-like") service the cluster
//! controller core depends on.
//!
//! The real ensemble-backed implementation lives outside this workspace;
//! this crate defines the contract the controller programs against.

mod backoff;
mod client;
mod error;
mod local;
mod paths;

pub use backoff::{ReconfigureAttempts, ReconfigureBackoff};
pub use client::{CoordinationClient, SessionEvent, TrackedVersions, ZnodeVersion};
pub use error::CoordinationError;
pub use local::{LocalCoordinationClient, LocalEnsemble};
pub use paths::ClusterPaths;
