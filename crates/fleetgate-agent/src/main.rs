//! fleetgate-agent - self-monitoring push service
//!
//! Runs on each host independently of the pre-flight gate. Exposes two
//! control endpoints; while active, it samples local CPU/memory/disk load
//! on a fixed interval and posts it to the collector.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

mod monitor;
mod server;

use server::AppState;

#[derive(Parser)]
#[command(name = "fleetgate-agent")]
#[command(version = fleetgate_core::VERSION)]
#[command(about = "Self-monitoring push agent", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "FLEETGATE_AGENT_LISTEN", default_value = "0.0.0.0:12345")]
    listen: SocketAddr,

    /// Sampling interval in seconds
    #[arg(long, default_value = "1")]
    interval_secs: u64,

    /// Path whose filesystem is reported as disk utilization
    #[arg(long, default_value = "/")]
    disk_path: PathBuf,

    /// Port assumed for a collector derived from the requester's address
    #[arg(long, default_value = "12345")]
    collector_port: u16,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    fleetgate_core::init_tracing(cli.json, level);

    let state = AppState::new(
        Duration::from_secs(cli.interval_secs),
        cli.disk_path,
        cli.collector_port,
    );
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("cannot bind {}", cli.listen))?;
    info!(listen = %cli.listen, "agent listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("serving control endpoints")?;

    Ok(())
}
