//! HTTP control plane: start/stop endpoints and the 404 fallback.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::monitor::{push_loop, MonitorState};

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Mutex<MonitorState>>,
    pub client: reqwest::Client,
    /// Sampling interval for the push loop.
    pub interval: Duration,
    /// Path whose filesystem is reported as disk utilization.
    pub disk_path: PathBuf,
    /// Port assumed for a collector derived from the requester's address.
    pub collector_port: u16,
}

impl AppState {
    pub fn new(interval: Duration, disk_path: PathBuf, collector_port: u16) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(MonitorState::Idle)),
            client: reqwest::Client::new(),
            interval,
            disk_path,
            collector_port,
        }
    }
}

/// Optional start-request body naming the collector explicitly.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// Base URL of the collector, e.g. "http://10.0.0.1:12345". Stats are
    /// posted to `<collector>/push-stats`. Defaults to the requester's
    /// address on the configured collector port.
    pub collector: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start-monitoring", post(start_monitoring))
        .route("/end-monitoring", post(end_monitoring))
        .fallback(not_found)
        .with_state(state)
}

pub async fn start_monitoring(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Option<Json<StartRequest>>,
) -> (StatusCode, &'static str) {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let collector = request
        .collector
        .unwrap_or_else(|| format!("http://{}:{}", peer.ip(), state.collector_port));
    let collector_url = format!("{}/push-stats", collector.trim_end_matches('/'));

    let mut monitor = state.monitor.lock().await;
    match monitor.start() {
        Ok(cancel) => {
            tokio::spawn(push_loop(
                state.client.clone(),
                collector_url,
                state.interval,
                state.disk_path.clone(),
                cancel,
            ));
            (StatusCode::OK, "monitoring started\n")
        }
        Err(_) => (StatusCode::CONFLICT, "monitoring is already active\n"),
    }
}

pub async fn end_monitoring(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let mut monitor = state.monitor.lock().await;
    monitor.stop();
    info!("monitoring deactivated");
    (StatusCode::OK, "monitoring stopped\n")
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "path not found\n")
}
