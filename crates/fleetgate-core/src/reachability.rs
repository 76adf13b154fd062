//! Reachability probe: ping sweep over the worker set, run before any
//! session is opened.

use futures::future::join_all;
use tokio::process::Command;
use tracing::info;

use crate::domain::{GateError, Result, Worker};

/// Classification of one ping attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
    /// The hostname did not resolve at all.
    UnknownHost,
}

/// Ping every worker once and fail fast on any unresolved or unreachable
/// host. Unresolvable names are reported first (the /etc/hosts fix), then
/// unreachable hosts; an empty reachable set is a configuration error.
pub async fn ping_sweep(workers: &[Worker]) -> Result<()> {
    if workers.is_empty() {
        return Err(GateError::NoWorkers);
    }

    let probes = workers.iter().map(|worker| async move {
        let result = Command::new("ping")
            .args(["-c", "1", &worker.host])
            .output()
            .await;
        let classification = match result {
            Ok(output) => classify_ping(
                output.status.success(),
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            ),
            Err(_) => Reachability::Unreachable,
        };
        (worker.clone(), classification)
    });
    let results = join_all(probes).await;

    let mut reachable = Vec::new();
    let mut unreachable = Vec::new();
    let mut unknown = Vec::new();
    for (worker, classification) in results {
        match classification {
            Reachability::Reachable => reachable.push(worker.host),
            Reachability::Unreachable => unreachable.push(worker.host),
            Reachability::UnknownHost => unknown.push(worker.host),
        }
    }

    if !unknown.is_empty() {
        return Err(GateError::UnresolvableHosts { hosts: unknown });
    }
    if !unreachable.is_empty() {
        return Err(GateError::UnreachableHosts { hosts: unreachable });
    }
    if reachable.is_empty() {
        return Err(GateError::NoWorkers);
    }

    info!(hosts = %reachable.join(", "), "successfully pinged all workers");
    Ok(())
}

/// Classify a single ping attempt from its exit status and output.
pub fn classify_ping(success: bool, stdout: &str, stderr: &str) -> Reachability {
    if success {
        return Reachability::Reachable;
    }
    let combined = format!("{stdout}\n{stderr}").to_lowercase();
    let unresolved = ["unknown host", "name or service not known", "failure in name resolution"]
        .iter()
        .any(|marker| combined.contains(marker));
    if unresolved {
        Reachability::UnknownHost
    } else {
        Reachability::Unreachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_ping_is_reachable() {
        let stdout = "1 packets transmitted, 1 received, 0% packet loss";
        assert_eq!(classify_ping(true, stdout, ""), Reachability::Reachable);
    }

    #[test]
    fn test_unresolved_name_is_unknown_host() {
        let stderr = "ping: bad-node: Name or service not known";
        assert_eq!(classify_ping(false, "", stderr), Reachability::UnknownHost);
        assert_eq!(
            classify_ping(false, "", "ping: unknown host w9"),
            Reachability::UnknownHost
        );
    }

    #[test]
    fn test_packet_loss_is_unreachable() {
        let stdout = "1 packets transmitted, 0 received, 100% packet loss";
        assert_eq!(classify_ping(false, stdout, ""), Reachability::Unreachable);
    }
}
