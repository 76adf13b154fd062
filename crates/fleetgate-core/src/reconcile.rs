//! Reconciler: turns a non-empty sentinel bucket into a hard failure.
//!
//! No automatic judgment is made across differing-but-present versions;
//! cross-version compatibility policy belongs to the operator.

use tracing::info;

use crate::domain::{GateError, Result, SubsystemKind, VersionMap};

/// Fail if any probed host landed in the sentinel bucket; otherwise the map
/// stands as-is for reporting. Hosts in the failure message are sorted
/// lexicographically, each listed once.
pub fn reconcile(subsystem: SubsystemKind, map: &VersionMap) -> Result<()> {
    let offenders: Vec<String> = map
        .unrecognized_hosts()
        .into_iter()
        .map(|w| w.host.clone())
        .collect();
    if !offenders.is_empty() {
        return Err(GateError::IncompatibleInstallation {
            subsystem,
            hosts: offenders,
        });
    }
    info!(
        subsystem = subsystem.label(),
        versions = map.recognized().count(),
        "all hosts reported a recognizable version; check that the versions are compatible"
    );
    Ok(())
}
