//! Member source: yields the ordered set of worker hostnames to check.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{GateError, Result, Worker};

/// Source of the worker set for a run.
#[async_trait]
pub trait MemberSource: Send + Sync {
    /// Ordered worker hostnames. An empty result is a fatal precondition
    /// for the whole run.
    async fn list_workers(&self) -> Result<Vec<Worker>>;
}

/// Reads workers from a file, one hostname per line. Blank lines and
/// `#` comments are skipped.
pub struct FileMemberSource {
    path: PathBuf,
}

impl FileMemberSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MemberSource for FileMemberSource {
    async fn list_workers(&self) -> Result<Vec<Worker>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|_| GateError::NoWorkers)?;
        let workers: Vec<Worker> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(Worker::new)
            .collect();
        if workers.is_empty() {
            return Err(GateError::NoWorkers);
        }
        debug!(count = workers.len(), file = %self.path.display(), "loaded worker list");
        Ok(workers)
    }
}

/// Fixed in-memory worker list, used by tests and embedding callers.
pub struct StaticMemberSource {
    workers: Vec<Worker>,
}

impl StaticMemberSource {
    pub fn new(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            workers: hosts.into_iter().map(Worker::new).collect(),
        }
    }
}

#[async_trait]
impl MemberSource for StaticMemberSource {
    async fn list_workers(&self) -> Result<Vec<Worker>> {
        if self.workers.is_empty() {
            return Err(GateError::NoWorkers);
        }
        Ok(self.workers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_file_source_skips_blanks_and_comments() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "# datanodes").unwrap();
        writeln!(file, "node-a").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  node-b  ").unwrap();

        let source = FileMemberSource::new(file.path());
        let workers = source.list_workers().await.expect("workers");
        assert_eq!(workers, vec![Worker::new("node-a"), Worker::new("node-b")]);
    }

    #[tokio::test]
    async fn test_empty_file_is_fatal() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let source = FileMemberSource::new(file.path());
        assert!(matches!(
            source.list_workers().await,
            Err(GateError::NoWorkers)
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let source = FileMemberSource::new("/nonexistent/slaves");
        assert!(matches!(
            source.list_workers().await,
            Err(GateError::NoWorkers)
        ));
    }

    #[tokio::test]
    async fn test_static_source_preserves_order() {
        let source = StaticMemberSource::new(["w2", "w1"]);
        let workers = source.list_workers().await.expect("workers");
        assert_eq!(workers[0].host, "w2");
        assert_eq!(workers[1].host, "w1");
    }
}
