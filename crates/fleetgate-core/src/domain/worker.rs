//! Worker identity: a cluster member addressed by hostname.

use serde::{Deserialize, Serialize};

/// Identifies a worker node by hostname or address.
///
/// No further identity is attached; the member source yields one `Worker`
/// per configured host and the set is fixed for the duration of a run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Worker {
    /// Hostname or address, e.g. "datanode-03" or "10.0.0.7".
    pub host: String,
}

impl Worker {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl std::fmt::Display for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.host)
    }
}
