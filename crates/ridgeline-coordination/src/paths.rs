//! Persistent znode layout under `/{root_prefix}/{cluster_name}/...`.

use std::fmt::{self, Display};

/// Computes the paths the core reads and writes under its cluster's
/// namespace. Kept as a small value type rather than inline string
/// formatting scattered through the controller, mirroring how
/// [`ridgeline_bundle`]'s codec centralizes the wire text form in one
/// place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterPaths {
    root_prefix: String,
    cluster_name: String,
}

impl ClusterPaths {
    pub fn new(root_prefix: impl Into<String>, cluster_name: impl Into<String>) -> Self {
        Self {
            root_prefix: root_prefix.into(),
            cluster_name: cluster_name.into(),
        }
    }

    fn base(&self) -> String {
        format!("/{}/{}", self.root_prefix.trim_matches('/'), self.cluster_name)
    }

    /// `indexes/{i}` -- ephemeral ballot, value is the index this replica
    /// votes for.
    pub fn index(&self, replica_index: u16) -> String {
        format!("{}/indexes/{replica_index}", self.base())
    }

    /// Parent of all ballots, used for `listChildren` during election.
    pub fn indexes_dir(&self) -> String {
        format!("{}/indexes", self.base())
    }

    /// `wantedstates` -- newline-separated `nodeId:serializedState`.
    pub fn wanted_states(&self) -> String {
        format!("{}/wantedstates", self.base())
    }

    /// `starttimestamps` -- newline-separated `nodeId:uint64`.
    pub fn start_timestamps(&self) -> String {
        format!("{}/starttimestamps", self.base())
    }

    /// `latestversion` -- decimal integer, CAS-protected.
    pub fn latest_version(&self) -> String {
        format!("{}/latestversion", self.base())
    }

    /// `published_state_bundle` -- serialized envelope, CAS-protected.
    pub fn published_state_bundle(&self) -> String {
        format!("{}/published_state_bundle", self.base())
    }
}

impl Display for ClusterPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())
    }
}
