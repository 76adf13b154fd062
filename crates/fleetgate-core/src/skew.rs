//! Clock-skew probe: measures the time difference between the coordinator
//! and every worker via the external `clockdiff` utility.
//!
//! Unlike the other stages this one evaluates every worker before deciding,
//! so the operator sees the full picture rather than the first offender.

use tokio::process::Command;
use tracing::info;

use crate::domain::{GateError, Result, Worker};

/// One worker's measured clock delta. `delta_ms` is `None` when clockdiff
/// output could not be parsed; such hosts are flagged conservatively.
#[derive(Debug, Clone)]
pub struct SkewEntry {
    pub worker: Worker,
    pub delta_ms: Option<i64>,
    pub flagged: bool,
}

/// The full sweep result; rendered by the caller before `check` decides.
#[derive(Debug, Clone)]
pub struct SkewReport {
    pub entries: Vec<SkewEntry>,
    pub threshold_ms: i64,
}

impl SkewReport {
    /// Fatal iff any entry is flagged. Offenders are listed sorted.
    pub fn check(&self) -> Result<()> {
        let mut offenders: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.flagged)
            .map(|e| e.worker.host.clone())
            .collect();
        if offenders.is_empty() {
            return Ok(());
        }
        offenders.sort();
        Err(GateError::ClockSkewExceeded {
            hosts: offenders,
            threshold_ms: self.threshold_ms,
        })
    }
}

/// Verify the external utility is installed before sweeping.
pub async fn ensure_clockdiff() -> Result<()> {
    let output = Command::new("which")
        .arg("clockdiff")
        .output()
        .await
        .map_err(GateError::Io)?;
    if output.status.success() && !output.stdout.is_empty() {
        return Ok(());
    }
    Err(GateError::MissingTool {
        tool: "clockdiff".to_string(),
        hint: "need clockdiff to calculate time skew; install it with \
               'sudo apt install iputils-clockdiff'"
            .to_string(),
    })
}

/// Measure every worker's delta against the coordinator.
pub async fn measure_skew(workers: &[Worker], threshold_ms: i64) -> Result<SkewReport> {
    ensure_clockdiff().await?;
    info!("calculating time skew across the cluster");

    let mut entries = Vec::with_capacity(workers.len());
    for worker in workers {
        let output = Command::new("clockdiff")
            .args(["-o", &worker.host])
            .output()
            .await
            .map_err(GateError::Io)?;
        let delta_ms = parse_clockdiff_delta(&String::from_utf8_lossy(&output.stdout));
        entries.push(entry(worker.clone(), delta_ms, threshold_ms));
    }

    Ok(SkewReport {
        entries,
        threshold_ms,
    })
}

/// Flagging policy: at or above the threshold (inclusive), or unreadable.
fn entry(worker: Worker, delta_ms: Option<i64>, threshold_ms: i64) -> SkewEntry {
    let flagged = match delta_ms {
        Some(delta) => delta.abs() >= threshold_ms,
        // Unknown skew fails the gate rather than silently passing.
        None => true,
    };
    SkewEntry {
        worker,
        delta_ms,
        flagged,
    }
}

/// The measured delta is the second whitespace-separated token of
/// `clockdiff -o` output.
pub fn parse_clockdiff_delta(stdout: &str) -> Option<i64> {
    stdout.split_whitespace().nth(1)?.parse().ok()
}
