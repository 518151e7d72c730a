//! Top-level controller errors.

use thiserror::Error;

/// Errors a [`crate::controller::FleetController`] tick can surface.
///
/// Most variants wrap a lower crate's error as-is; [`ControllerError::Configuration`]
/// covers misconfiguration caught at startup (an unknown bucket space named
/// in [`crate::config::ControllerConfig`], or a duplicate node index within
/// the same cluster).
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Generator(#[from] ridgeline_generator::GeneratorError),

    #[error(transparent)]
    Coordination(#[from] ridgeline_coordination::CoordinationError),

    #[error(transparent)]
    Envelope(#[from] ridgeline_agent_protocol::EnvelopeError),

    #[error("configuration error: {0}")]
    Configuration(String),
}
