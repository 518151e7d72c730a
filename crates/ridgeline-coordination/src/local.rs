//! An in-memory [`CoordinationClient`] double.
//!
//! A small, in-process authoritative map guarded by a typed error enum --
//! `Clone`, no I/O. Used by this workspace's own test suite and usable
//! as-is for embedding a single-replica deployment that never needs real
//! ensemble coordination. The real ensemble-backed client lives outside
//! this workspace and is not implemented here.

use std::collections::BTreeMap;

use crate::client::{CoordinationClient, SessionEvent, ZnodeVersion};
use crate::error::CoordinationError;

#[derive(Debug, Clone)]
struct Znode {
    data: Vec<u8>,
    version: ZnodeVersion,
    ephemeral: bool,
}

/// In-memory double for [`CoordinationClient`]. A single instance models
/// one ensemble: multiple [`LocalCoordinationClient`] "sessions" share it
/// via [`LocalCoordinationClient::attach`] to simulate multiple leader
/// replicas racing for the same znodes.
#[derive(Debug, Default)]
pub struct LocalEnsemble {
    nodes: BTreeMap<String, Znode>,
    reconfig_in_progress: bool,
}

impl LocalEnsemble {
    pub fn new() -> Self {
        Self::default()
    }

    fn drop_session_ephemerals(&mut self, paths: &[String]) {
        for path in paths {
            self.nodes.remove(path);
        }
    }

    /// Marks a reconfiguration as still running, so a subsequent
    /// `reconfigure_ensemble` call observes [`CoordinationError::ReconfigInProgress`].
    /// Test-only: there is no joiner/leaver catch-up to simulate here, so
    /// completion is left to an explicit [`LocalEnsemble::complete_reconfigure`]
    /// call rather than happening automatically.
    pub fn begin_reconfigure(&mut self) {
        self.reconfig_in_progress = true;
    }

    /// Clears the in-progress flag set by [`LocalEnsemble::begin_reconfigure`]
    /// or by a prior `reconfigure_ensemble` call, simulating the
    /// reconfiguration finishing.
    pub fn complete_reconfigure(&mut self) {
        self.reconfig_in_progress = false;
    }
}

/// One session against a [`LocalEnsemble`]. Implements
/// [`CoordinationClient`] by operating directly on the shared ensemble
/// state -- there is no network, so every call completes synchronously
/// with no latency, which is exactly what a deterministic test double
/// needs.
#[derive(Debug)]
pub struct LocalCoordinationClient<'a> {
    ensemble: &'a std::sync::Mutex<LocalEnsemble>,
    session_ephemerals: Vec<String>,
    connected: bool,
    pending_events: Vec<SessionEvent>,
}

impl<'a> LocalCoordinationClient<'a> {
    pub fn attach(ensemble: &'a std::sync::Mutex<LocalEnsemble>) -> Self {
        Self {
            ensemble,
            session_ephemerals: Vec::new(),
            connected: false,
            pending_events: Vec::new(),
        }
    }

    /// Simulates the coordination service declaring this session's liveness
    /// check expired: every ephemeral created under it vanishes and an
    /// [`SessionEvent::Expired`] is queued for the next poll.
    pub fn simulate_expiry(&mut self) {
        let mut ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        ensemble.drop_session_ephemerals(&self.session_ephemerals);
        self.session_ephemerals.clear();
        self.connected = false;
        self.pending_events.push(SessionEvent::Expired);
    }

    pub fn simulate_disconnect(&mut self) {
        self.connected = false;
        self.pending_events.push(SessionEvent::Disconnected);
    }
}

impl CoordinationClient for LocalCoordinationClient<'_> {
    fn connect(&mut self, _address: &str, _session_timeout_ms: u64) -> Result<(), CoordinationError> {
        self.connected = true;
        self.pending_events.push(SessionEvent::SyncConnected);
        Ok(())
    }

    fn poll_session_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn create_ephemeral(&mut self, path: &str, data: &[u8]) -> Result<(), CoordinationError> {
        if !self.connected {
            return Err(CoordinationError::SessionDisconnected);
        }
        let mut ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        ensemble.nodes.insert(
            path.to_string(),
            Znode {
                data: data.to_vec(),
                version: ZnodeVersion::initial(),
                ephemeral: true,
            },
        );
        self.session_ephemerals.push(path.to_string());
        Ok(())
    }

    fn create_persistent(&mut self, path: &str, data: &[u8]) -> Result<(), CoordinationError> {
        if !self.connected {
            return Err(CoordinationError::SessionDisconnected);
        }
        let mut ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        if ensemble.nodes.contains_key(path) {
            return Err(CoordinationError::NodeExists(path.to_string()));
        }
        ensemble.nodes.insert(
            path.to_string(),
            Znode {
                data: data.to_vec(),
                version: ZnodeVersion::initial(),
                ephemeral: false,
            },
        );
        Ok(())
    }

    fn set_data(
        &mut self,
        path: &str,
        data: &[u8],
        expected_version: ZnodeVersion,
    ) -> Result<ZnodeVersion, CoordinationError> {
        if !self.connected {
            return Err(CoordinationError::SessionDisconnected);
        }
        let mut ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        let znode = ensemble.nodes.entry(path.to_string()).or_insert_with(|| Znode {
            data: Vec::new(),
            version: ZnodeVersion::initial(),
            ephemeral: false,
        });
        if znode.version != expected_version {
            return Err(CoordinationError::CasWriteFailed {
                path: path.to_string(),
                expected: expected_version.0,
            });
        }
        znode.data = data.to_vec();
        znode.version = znode.version.next();
        Ok(znode.version)
    }

    fn get_data(&mut self, path: &str) -> Result<(Vec<u8>, ZnodeVersion), CoordinationError> {
        if !self.connected {
            return Err(CoordinationError::SessionDisconnected);
        }
        let ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        ensemble
            .nodes
            .get(path)
            .map(|znode| (znode.data.clone(), znode.version))
            .ok_or_else(|| CoordinationError::NoNode(path.to_string()))
    }

    fn list_children(&mut self, path: &str, _watch: bool) -> Result<Vec<String>, CoordinationError> {
        if !self.connected {
            return Err(CoordinationError::SessionDisconnected);
        }
        let ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut children: Vec<String> = ensemble
            .nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect();
        children.sort();
        Ok(children)
    }

    fn delete(&mut self, path: &str, expected_version: ZnodeVersion) -> Result<(), CoordinationError> {
        if !self.connected {
            return Err(CoordinationError::SessionDisconnected);
        }
        let mut ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        match ensemble.nodes.get(path) {
            Some(znode) if znode.version == expected_version => {
                ensemble.nodes.remove(path);
                Ok(())
            }
            Some(znode) => Err(CoordinationError::CasWriteFailed {
                path: path.to_string(),
                expected: znode.version.0,
            }),
            None => Err(CoordinationError::NoNode(path.to_string())),
        }
    }

    fn reconfigure_ensemble(&mut self, _joining: &[String], _leaving: &[String]) -> Result<(), CoordinationError> {
        let mut ensemble = self.ensemble.lock().expect("local ensemble mutex poisoned");
        if ensemble.reconfig_in_progress {
            return Err(CoordinationError::ReconfigInProgress);
        }
        ensemble.reconfig_in_progress = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cas_write_succeeds_with_matching_version_and_advances_it() {
        let ensemble = std::sync::Mutex::new(LocalEnsemble::new());
        let mut client = LocalCoordinationClient::attach(&ensemble);
        client.connect("local", 1_000).unwrap();

        let v1 = client.set_data("/c/latestversion", b"1", ZnodeVersion::initial()).unwrap();
        assert_eq!(v1, ZnodeVersion(1));
        let v2 = client.set_data("/c/latestversion", b"2", v1).unwrap();
        assert_eq!(v2, ZnodeVersion(2));
    }

    #[test]
    fn two_leaders_racing_on_the_same_version_only_one_wins() {
        let ensemble = std::sync::Mutex::new(LocalEnsemble::new());
        let mut a = LocalCoordinationClient::attach(&ensemble);
        let mut b = LocalCoordinationClient::attach(&ensemble);
        a.connect("local", 1_000).unwrap();
        b.connect("local", 1_000).unwrap();

        let (_, initial) = {
            a.create_persistent("/c/latestversion", b"7").unwrap();
            a.get_data("/c/latestversion").unwrap()
        };

        let a_result = a.set_data("/c/latestversion", b"8", initial);
        let b_result = b.set_data("/c/latestversion", b"8", initial);
        assert!(a_result.is_ok() != b_result.is_ok(), "exactly one of the two racing writers must succeed");
    }

    #[test]
    fn expiry_drops_ephemerals_and_queues_expired_event() {
        let ensemble = std::sync::Mutex::new(LocalEnsemble::new());
        let mut client = LocalCoordinationClient::attach(&ensemble);
        client.connect("local", 1_000).unwrap();
        client.create_ephemeral("/c/indexes/0", b"0").unwrap();
        assert!(client.get_data("/c/indexes/0").is_ok());

        client.simulate_expiry();
        let events = client.poll_session_events();
        assert_eq!(events, vec![SessionEvent::Expired]);

        let mut other = LocalCoordinationClient::attach(&ensemble);
        other.connect("local", 1_000).unwrap();
        assert!(matches!(other.get_data("/c/indexes/0"), Err(CoordinationError::NoNode(_))));
    }

    #[test]
    fn writes_after_expiry_fail_until_reconnected() {
        let ensemble = std::sync::Mutex::new(LocalEnsemble::new());
        let mut client = LocalCoordinationClient::attach(&ensemble);
        client.connect("local", 1_000).unwrap();
        client.simulate_expiry();

        let result = client.set_data("/c/latestversion", b"1", ZnodeVersion::initial());
        assert!(matches!(result, Err(CoordinationError::SessionDisconnected)));
    }

    #[test]
    fn create_persistent_is_idempotent_on_node_exists() {
        let ensemble = std::sync::Mutex::new(LocalEnsemble::new());
        let mut client = LocalCoordinationClient::attach(&ensemble);
        client.connect("local", 1_000).unwrap();
        client.create_persistent("/c/wantedstates", b"").unwrap();
        let err = client.create_persistent("/c/wantedstates", b"").unwrap_err();
        assert!(matches!(err, CoordinationError::NodeExists(_)));
    }

    #[test]
    fn reconfigure_fails_while_one_is_already_in_progress_and_recovers_once_cleared() {
        let ensemble = std::sync::Mutex::new(LocalEnsemble::new());
        let mut client = LocalCoordinationClient::attach(&ensemble);
        client.connect("local", 1_000).unwrap();

        client.reconfigure_ensemble(&["4".to_string()], &[]).unwrap();
        let err = client.reconfigure_ensemble(&["5".to_string()], &[]).unwrap_err();
        assert!(matches!(err, CoordinationError::ReconfigInProgress));

        ensemble.lock().unwrap().complete_reconfigure();
        client.reconfigure_ensemble(&["5".to_string()], &[]).unwrap();
    }

    #[test]
    fn list_children_returns_only_direct_children() {
        let ensemble = std::sync::Mutex::new(LocalEnsemble::new());
        let mut client = LocalCoordinationClient::attach(&ensemble);
        client.connect("local", 1_000).unwrap();
        client.create_ephemeral("/c/indexes/0", b"0").unwrap();
        client.create_ephemeral("/c/indexes/1", b"1").unwrap();
        let children = client.list_children("/c/indexes", false).unwrap();
        assert_eq!(children, vec!["0".to_string(), "1".to_string()]);
    }
}
