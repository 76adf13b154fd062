//! Load sampling and push loop.
//!
//! The agent is either `Idle` or `Monitoring`; the two control endpoints
//! are the only transitions. While monitoring, a fixed-interval task
//! samples CPU, memory, and disk utilization and posts the payload to the
//! collector; stopping cancels the loop through its token.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Monitoring state machine. No process-global flag: handlers share this
/// through the router state and drive transitions exclusively through the
/// two control endpoints.
#[derive(Default)]
pub enum MonitorState {
    #[default]
    Idle,
    Monitoring {
        cancel: CancellationToken,
    },
}

impl MonitorState {
    pub fn is_active(&self) -> bool {
        matches!(self, MonitorState::Monitoring { .. })
    }

    /// Transition to `Monitoring`. Fails when already active; the caller
    /// maps that to a conflict response.
    pub fn start(&mut self) -> Result<CancellationToken, AlreadyMonitoring> {
        if self.is_active() {
            return Err(AlreadyMonitoring);
        }
        let cancel = CancellationToken::new();
        *self = MonitorState::Monitoring {
            cancel: cancel.clone(),
        };
        Ok(cancel)
    }

    /// Transition to `Idle`, cancelling the sampler. Idempotent.
    pub fn stop(&mut self) {
        if let MonitorState::Monitoring { cancel } = std::mem::take(self) {
            cancel.cancel();
        }
    }
}

/// Start was requested while a sampler is already running.
#[derive(Debug, PartialEq, Eq)]
pub struct AlreadyMonitoring;

/// One load sample delivered to the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsPayload {
    pub host: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk_percent: f32,
    pub sampled_at: DateTime<Utc>,
}

/// Sampler loop: one payload per tick until cancelled.
pub async fn push_loop(
    client: reqwest::Client,
    collector_url: String,
    interval: Duration,
    disk_path: PathBuf,
    cancel: CancellationToken,
) {
    info!(collector = %collector_url, interval_secs = interval.as_secs(), "monitoring started");
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    let mut system = System::new();
    // Prime the CPU counters; the first reading is meaningless otherwise.
    system.refresh_cpu_usage();

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("monitoring stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let payload = sample(&mut system, &host, &disk_path);
        debug!(
            cpu = payload.cpu_percent,
            memory = payload.memory_percent,
            disk = payload.disk_percent,
            "sampled load"
        );
        if let Err(e) = client.post(&collector_url).json(&payload).send().await {
            warn!(error = %e, collector = %collector_url, "failed to push stats");
        }
    }
}

fn sample(system: &mut System, host: &str, disk_path: &Path) -> StatsPayload {
    system.refresh_cpu_usage();
    system.refresh_memory();

    let memory_percent = match system.total_memory() {
        0 => 0.0,
        total => (system.used_memory() as f32 / total as f32) * 100.0,
    };

    StatsPayload {
        host: host.to_string(),
        cpu_percent: system.global_cpu_usage(),
        memory_percent,
        disk_percent: disk_usage_percent(&Disks::new_with_refreshed_list(), disk_path),
        sampled_at: Utc::now(),
    }
}

/// Utilization of the disk whose mount point contains `path`; the longest
/// matching mount wins. Zero when nothing matches.
fn disk_usage_percent(disks: &Disks, path: &Path) -> f32 {
    disks
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| {
            let total = disk.total_space();
            if total == 0 {
                return 0.0;
            }
            let used = total.saturating_sub(disk.available_space());
            (used as f32 / total as f32) * 100.0
        })
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_start_transitions_to_monitoring() {
        let mut state = MonitorState::Idle;
        assert!(!state.is_active());
        let token = state.start().expect("start from idle");
        assert!(state.is_active());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_double_start_is_rejected() {
        let mut state = MonitorState::Idle;
        state.start().expect("first start");
        assert_eq!(state.start().expect_err("second start"), AlreadyMonitoring);
        assert!(state.is_active());
    }

    #[test]
    fn test_stop_cancels_and_returns_to_idle() {
        let mut state = MonitorState::Idle;
        let token = state.start().expect("start");
        state.stop();
        assert!(!state.is_active());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_stop_while_idle_is_idempotent() {
        let mut state = MonitorState::Idle;
        state.stop();
        assert!(!state.is_active());
    }

    #[test]
    fn test_restart_after_stop_is_allowed() {
        let mut state = MonitorState::Idle;
        state.start().expect("first cycle");
        state.stop();
        state.start().expect("second cycle");
        assert!(state.is_active());
    }

    #[test]
    fn test_stats_payload_serializes_expected_fields() {
        let payload = StatsPayload {
            host: "worker-1".to_string(),
            cpu_percent: 12.5,
            memory_percent: 40.0,
            disk_percent: 71.3,
            sampled_at: Utc::now(),
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert!(json.get("cpu_percent").is_some());
        assert!(json.get("memory_percent").is_some());
        assert!(json.get("disk_percent").is_some());
        assert_eq!(json.get("host").and_then(|v| v.as_str()), Some("worker-1"));
    }
}
