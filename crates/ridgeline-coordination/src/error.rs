//! Coordination errors.

use thiserror::Error;

/// Errors surfaced by a [`crate::CoordinationClient`].
///
/// Every outcome, including a CAS conflict, is an ordinary `Result` value
/// rather than an exceptional control-flow path:
/// [`CoordinationError::CasWriteFailed`] is a signal to re-read and
/// regenerate, not a hard failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// A `setData` call's expected version did not match the znode's
    /// current version. Recoverable: re-read
    /// both tracked versions and regenerate.
    #[error("CAS write to {path} failed: expected version {expected}")]
    CasWriteFailed { path: String, expected: u64 },

    /// The session is connected but temporarily unable to serve requests.
    #[error("coordination session disconnected")]
    SessionDisconnected,

    /// The session has been declared dead by the coordination service; all
    /// ephemeral nodes created under it are gone and election must be
    /// reopened.
    #[error("coordination session expired")]
    SessionExpired,

    /// `createPersistent` found an existing node at `path`. This is
    /// idempotent -- callers should treat it as success, not propagate it
    /// as a failure; the variant exists so a [`crate::CoordinationClient`]
    /// implementation can report the distinction and a caller can choose
    /// to log it.
    #[error("node already exists: {0}")]
    NodeExists(String),

    /// An operation referenced a path with no znode.
    #[error("no such node: {0}")]
    NoNode(String),

    /// `reconfigureEnsemble` could not proceed because another
    /// reconfiguration is already underway. Retried by the
    /// caller with backoff.
    #[error("ensemble reconfiguration already in progress")]
    ReconfigInProgress,

    /// Transport/storage-level failure from the underlying coordination
    /// service, not otherwise classified.
    #[error("coordination I/O error: {0}")]
    Io(String),
}

impl CoordinationError {
    /// Whether this error is internally recoverable by re-reading and
    /// retrying within the same tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoordinationError::CasWriteFailed { .. }
                | CoordinationError::SessionDisconnected
                | CoordinationError::ReconfigInProgress
        )
    }
}
