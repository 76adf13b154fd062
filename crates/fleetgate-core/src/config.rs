//! Run configuration for the pre-flight gate.

use std::path::PathBuf;

/// Knobs for one gate run. Assembled by the CLI from flags and
/// `FLEETGATE_*` environment variables.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Remote username for worker sessions.
    pub ssh_user: String,
    /// SSH port on the workers.
    pub ssh_port: u16,
    /// Explicit private key path; `None` discovers `~/.ssh/id_*`.
    pub identity: Option<PathBuf>,
    /// Deadline for opening a session to one worker.
    pub connect_timeout_secs: u64,
    /// Deadline for one remote command producing its full output.
    pub command_timeout_secs: u64,
    /// Concurrent session ceiling; 0 means one task per worker, uncapped.
    pub max_sessions: usize,
    /// Fallback platform tool path when the remote shell reports no
    /// location for it.
    pub platform_tool_fallback: String,
    /// Directory the version report files are written to.
    pub report_dir: PathBuf,
    /// Workers file, one hostname per line.
    pub workers_file: PathBuf,
    /// Inclusive clock-skew failure threshold in milliseconds.
    pub skew_threshold_ms: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ssh_user: "hduser".to_string(),
            ssh_port: 22,
            identity: None,
            connect_timeout_secs: 30,
            command_timeout_secs: 30,
            max_sessions: 0,
            platform_tool_fallback: "/usr/local/hadoop/bin/hadoop".to_string(),
            report_dir: PathBuf::from("."),
            workers_file: PathBuf::from("/usr/local/hadoop/etc/hadoop/slaves"),
            skew_threshold_ms: 20_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_operational_expectations() {
        let config = GateConfig::default();
        assert_eq!(config.ssh_port, 22);
        assert_eq!(config.skew_threshold_ms, 20_000);
        assert_eq!(config.max_sessions, 0);
        assert!(config.platform_tool_fallback.ends_with("bin/hadoop"));
    }
}
