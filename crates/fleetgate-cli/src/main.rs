//! Fleetgate - cluster pre-flight gate
//!
//! Run from the coordinator before starting distributed services. Verifies,
//! in order, that every worker is reachable, accepts this host's
//! credentials, runs recognizable software versions, and has its clock
//! synchronised. Any failing stage aborts the run with an actionable
//! message and a non-zero exit code; there is no partial-success mode.
//!
//! ## Commands
//!
//! - `check`: run the full gate (ping, auth, versions, skew)
//! - `ping`: reachability sweep only
//! - `auth`: credential probe only
//! - `versions`: version inventory, reconciliation, and report files
//! - `skew`: clock-skew sweep only

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

use fleetgate_core::{
    inventory, local_platform_version, local_runtime_version, measure_skew, ping_sweep, reconcile,
    verify_credentials, write_version_report, FileMemberSource, GateConfig, MemberSource,
    SkewReport, SshConnector, SubsystemKind, Worker,
};

const RUNTIME_REPORT: &str = "runtime_versions.txt";
const PLATFORM_REPORT: &str = "platform_versions.txt";

#[derive(Parser)]
#[command(name = "fleetgate")]
#[command(version = fleetgate_core::VERSION)]
#[command(about = "Pre-flight validator for cluster worker nodes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    gate: GateArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GateArgs {
    /// Workers file, one hostname per line
    #[arg(long, env = "FLEETGATE_WORKERS_FILE", default_value = "/usr/local/hadoop/etc/hadoop/slaves")]
    workers_file: PathBuf,

    /// Remote username for worker sessions
    #[arg(long, env = "FLEETGATE_SSH_USER", default_value = "hduser")]
    ssh_user: String,

    /// SSH port on the workers
    #[arg(long, env = "FLEETGATE_SSH_PORT", default_value = "22")]
    ssh_port: u16,

    /// Private key path (default: discover ~/.ssh/id_*)
    #[arg(long, env = "FLEETGATE_IDENTITY")]
    identity: Option<PathBuf>,

    /// Session open deadline in seconds
    #[arg(long, default_value = "30")]
    connect_timeout: u64,

    /// Per-command deadline in seconds
    #[arg(long, default_value = "30")]
    command_timeout: u64,

    /// Concurrent session ceiling (0 = one task per worker)
    #[arg(long, env = "FLEETGATE_MAX_SESSIONS", default_value = "0")]
    max_sessions: usize,

    /// Fallback platform tool path when `which` finds nothing
    #[arg(long, default_value = "/usr/local/hadoop/bin/hadoop")]
    platform_tool: String,

    /// Directory the version reports are written to
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,

    /// Inclusive clock-skew failure threshold in milliseconds
    #[arg(long, default_value = "20000")]
    skew_threshold_ms: i64,
}

impl GateArgs {
    fn to_config(&self) -> GateConfig {
        GateConfig {
            ssh_user: self.ssh_user.clone(),
            ssh_port: self.ssh_port,
            identity: self.identity.clone(),
            connect_timeout_secs: self.connect_timeout,
            command_timeout_secs: self.command_timeout,
            max_sessions: self.max_sessions,
            platform_tool_fallback: self.platform_tool.clone(),
            report_dir: self.report_dir.clone(),
            workers_file: self.workers_file.clone(),
            skew_threshold_ms: self.skew_threshold_ms,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pre-flight gate
    Check,
    /// Reachability sweep only
    Ping,
    /// Credential probe only
    Auth,
    /// Version inventory, reconciliation, and report files
    Versions,
    /// Clock-skew sweep only
    Skew,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    fleetgate_core::init_tracing(cli.json, level);

    let config = cli.gate.to_config();
    let workers = FileMemberSource::new(&config.workers_file)
        .list_workers()
        .await?;

    match cli.command {
        Commands::Check => {
            check_ping(&workers).await?;
            check_auth(&config, &workers).await?;
            check_versions(&config, &workers).await?;
            check_skew(&config, &workers).await?;
            info!("all pre-flight checks passed; the cluster services may be started");
        }
        Commands::Ping => check_ping(&workers).await?,
        Commands::Auth => check_auth(&config, &workers).await?,
        Commands::Versions => check_versions(&config, &workers).await?,
        Commands::Skew => check_skew(&config, &workers).await?,
    }

    Ok(())
}

async fn check_ping(workers: &[Worker]) -> Result<()> {
    ping_sweep(workers).await.context("reachability check")?;
    Ok(())
}

async fn check_auth(config: &GateConfig, workers: &[Worker]) -> Result<()> {
    let connector = SshConnector::new(config);
    verify_credentials(&connector, workers)
        .await
        .context("credential check")?;
    Ok(())
}

async fn check_versions(config: &GateConfig, workers: &[Worker]) -> Result<()> {
    let local_runtime = local_runtime_version().await?;
    let local_platform = local_platform_version().await?;

    let connector = Arc::new(SshConnector::new(config));
    let outcome = inventory(
        connector,
        config,
        workers,
        local_runtime,
        local_platform,
        CancellationToken::new(),
    )
    .await?;

    reconcile(SubsystemKind::Runtime, &outcome.runtime)?;
    reconcile(SubsystemKind::Platform, &outcome.platform)?;

    write_version_report(&outcome.runtime, &config.report_dir.join(RUNTIME_REPORT))?;
    write_version_report(&outcome.platform, &config.report_dir.join(PLATFORM_REPORT))?;
    Ok(())
}

async fn check_skew(config: &GateConfig, workers: &[Worker]) -> Result<()> {
    let report = measure_skew(workers, config.skew_threshold_ms).await?;
    print_skew_report(&report);
    report.check()?;
    info!("time difference between cluster nodes is within the threshold");
    Ok(())
}

/// Render every host's delta, offenders highlighted in red, before the
/// pass/fail decision so the operator sees the full picture.
fn print_skew_report(report: &SkewReport) {
    println!("------------------------");
    for entry in &report.entries {
        let delta = entry
            .delta_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "unreadable".to_string());
        if entry.flagged {
            println!("Host:\t{}\t\x1b[1;31mDifference:\t{delta}\x1b[0m", entry.worker);
        } else {
            println!("Host:\t{}\tDifference:\t{delta}", entry.worker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_gate_args_map_onto_config() {
        let cli = Cli::parse_from([
            "fleetgate",
            "--workers-file",
            "/tmp/slaves",
            "--ssh-user",
            "ops",
            "--max-sessions",
            "8",
            "check",
        ]);
        let config = cli.gate.to_config();
        assert_eq!(config.ssh_user, "ops");
        assert_eq!(config.max_sessions, 8);
        assert_eq!(config.workers_file, PathBuf::from("/tmp/slaves"));
        assert_eq!(config.skew_threshold_ms, 20_000);
    }
}
