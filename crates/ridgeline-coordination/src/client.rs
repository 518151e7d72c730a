//! The [`CoordinationClient`] trait: the small ordered-log service contract
//! the core requires.
//!
//! Modeled as a blocking, synchronous trait rather than `async fn`: the
//! controller thread is single-threaded cooperative, suspending only at
//! well-defined points (tick, watch, RPC completion). That suspension is
//! the caller's concern, not this trait's -- a real ensemble-backed
//! implementation blocks the controller thread for the duration of a call,
//! the same way an event loop built on a blocking poll rather than an
//! async executor blocks between iterations.

use crate::error::CoordinationError;

/// A monotonically increasing znode version, as returned by `getData` and
/// required by `setData`'s CAS check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZnodeVersion(pub u64);

impl ZnodeVersion {
    pub fn initial() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Session lifecycle events the coordination client delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session is established (or re-established after a transient
    /// disconnect) and able to serve requests.
    SyncConnected,
    /// The underlying connection dropped; the session may still be alive
    /// server-side and reconnect automatically.
    Disconnected,
    /// The session has been declared dead. Every ephemeral node created
    /// under it is gone; the core must not assume any survived.
    Expired,
}

/// The small ordered-log service contract the controller requires:
/// ephemeral and persistent nodes, CAS writes, watches, and ensemble
/// reconfiguration.
///
/// The real ensemble-backed implementation lives outside this workspace --
/// the controller depends only on this trait, never on a concrete client.
pub trait CoordinationClient {
    /// Establishes a session against `address`. Subsequent calls operate
    /// against this session until it is expired or `connect` is called
    /// again.
    fn connect(&mut self, address: &str, session_timeout_ms: u64) -> Result<(), CoordinationError>;

    /// Drains session lifecycle events observed since the last call. The
    /// core must not assume an empty result means nothing happened -- it
    /// means nothing *new* happened since the last drain.
    fn poll_session_events(&mut self) -> Vec<SessionEvent>;

    /// Creates an ephemeral node at `path`, tied to the current session:
    /// deleted automatically on session loss.
    fn create_ephemeral(&mut self, path: &str, data: &[u8]) -> Result<(), CoordinationError>;

    /// Creates a persistent node at `path`. Idempotent on `NodeExists`: a
    /// caller may treat the `Err(NodeExists)` case as success.
    fn create_persistent(&mut self, path: &str, data: &[u8]) -> Result<(), CoordinationError>;

    /// Conditional write: succeeds only if the znode's current version
    /// equals `expected_version`, otherwise fails with
    /// [`CoordinationError::CasWriteFailed`]. Returns the new
    /// version on success.
    fn set_data(
        &mut self,
        path: &str,
        data: &[u8],
        expected_version: ZnodeVersion,
    ) -> Result<ZnodeVersion, CoordinationError>;

    /// Reads the current value and version of `path`.
    fn get_data(&mut self, path: &str) -> Result<(Vec<u8>, ZnodeVersion), CoordinationError>;

    /// Lists the children of `path`. If `watch` is set, a future change to
    /// the child set should surface as a [`SessionEvent`]-adjacent signal
    /// the caller polls for via the same mechanism it uses for other
    /// coordination-driven wakeups.
    fn list_children(&mut self, path: &str, watch: bool) -> Result<Vec<String>, CoordinationError>;

    /// Conditional delete.
    fn delete(&mut self, path: &str, expected_version: ZnodeVersion) -> Result<(), CoordinationError>;

    /// Atomically updates voting ensemble membership. May fail with
    /// [`CoordinationError::ReconfigInProgress`]; callers retry with
    /// backoff.
    fn reconfigure_ensemble(&mut self, joining: &[String], leaving: &[String]) -> Result<(), CoordinationError>;
}

/// The two znode versions a leader must hold before attempting a CAS write:
/// the last observed version of `latestversion` and of
/// `published_state_bundle`. Updated only by successful reads and
/// successful CAS writes; cleared wholesale on [`SessionEvent::Expired`],
/// since every fact it held was scoped to the now-dead session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackedVersions {
    pub state_version: Option<ZnodeVersion>,
    pub bundle_version: Option<ZnodeVersion>,
}

impl TrackedVersions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_state_version(&mut self, version: ZnodeVersion) {
        self.state_version = Some(version);
    }

    pub fn observe_bundle_version(&mut self, version: ZnodeVersion) {
        self.bundle_version = Some(version);
    }

    /// Clears both tracked versions. Called on [`SessionEvent::Expired`].
    pub fn clear(&mut self) {
        self.state_version = None;
        self.bundle_version = None;
    }

    /// Whether both versions have been observed at least once -- a
    /// precondition for attempting a CAS write, since `setData` needs a
    /// concrete `expected_version`.
    pub fn is_ready_to_write(&self) -> bool {
        self.state_version.is_some() && self.bundle_version.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_versions_clear_on_expiry() {
        let mut tracked = TrackedVersions::new();
        tracked.observe_state_version(ZnodeVersion(3));
        tracked.observe_bundle_version(ZnodeVersion(7));
        assert!(tracked.is_ready_to_write());

        tracked.clear();
        assert!(!tracked.is_ready_to_write());
        assert_eq!(tracked.state_version, None);
    }

    #[test]
    fn znode_version_next_increments() {
        assert_eq!(ZnodeVersion::initial().next(), ZnodeVersion(1));
    }
}
