//! Version identifiers and the version-keyed host buckets that the
//! inventory engine aggregates into.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::worker::Worker;

/// Sentinel bucket key for hosts whose version could not be extracted.
const UNRECOGNIZED: &str = "none";

/// An opaque version token extracted from command output.
///
/// The sentinel value returned by [`VersionId::unrecognized`] marks
/// extraction failure and is distinguished from every real version string;
/// the reconciler turns a non-empty sentinel bucket into a hard failure.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The sentinel for "no version could be extracted".
    pub fn unrecognized() -> Self {
        Self(UNRECOGNIZED.to_string())
    }

    pub fn is_unrecognized(&self) -> bool {
        self.0 == UNRECOGNIZED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which probed subsystem a version map belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemKind {
    /// The language runtime (e.g. the JVM).
    Runtime,
    /// The platform installation (e.g. Hadoop).
    Platform,
}

impl SubsystemKind {
    pub fn label(&self) -> &'static str {
        match self {
            SubsystemKind::Runtime => "runtime",
            SubsystemKind::Platform => "platform",
        }
    }
}

/// Hosts grouped by observed version.
///
/// Invariant: every probed worker appears in exactly one bucket. The map is
/// created with the master pre-seeded into its locally measured bucket and
/// an empty sentinel bucket, populated during fan-out, and read-only from
/// reconciliation onward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMap {
    buckets: BTreeMap<VersionId, BTreeSet<Worker>>,
}

impl VersionMap {
    /// Create a map seeded with the master's own measurement plus the empty
    /// sentinel bucket.
    pub fn seeded(local_version: VersionId, master: Worker) -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert(VersionId::unrecognized(), BTreeSet::new());
        buckets.insert(local_version, BTreeSet::from([master]));
        Self { buckets }
    }

    /// Record one worker under one version bucket.
    pub fn record(&mut self, version: VersionId, worker: Worker) {
        self.buckets.entry(version).or_default().insert(worker);
    }

    /// Total hosts across all buckets (including the sentinel bucket).
    pub fn hosts_total(&self) -> usize {
        self.buckets.values().map(|hosts| hosts.len()).sum()
    }

    /// Hosts in the sentinel bucket, already lexicographically sorted.
    pub fn unrecognized_hosts(&self) -> Vec<&Worker> {
        self.buckets
            .get(&VersionId::unrecognized())
            .map(|hosts| hosts.iter().collect())
            .unwrap_or_default()
    }

    /// Iterate real version buckets, skipping the sentinel bucket.
    /// Hosts within a bucket come out lexicographically sorted.
    pub fn recognized(&self) -> impl Iterator<Item = (&VersionId, &BTreeSet<Worker>)> {
        self.buckets
            .iter()
            .filter(|(version, _)| !version.is_unrecognized())
    }

    /// Hosts recorded under a specific version, if any.
    pub fn hosts_for(&self, version: &VersionId) -> Option<&BTreeSet<Worker>> {
        self.buckets.get(version)
    }
}
