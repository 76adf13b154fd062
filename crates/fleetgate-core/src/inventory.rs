//! Concurrent inventory engine: fan out one probe task per worker, collect
//! runtime and platform versions over the session protocol, and aggregate
//! them into version-keyed buckets.
//!
//! Results travel through an mpsc channel consumed by a single aggregator,
//! so no lock guards the maps; the `JoinSet` is drained to completion
//! before [`inventory`] returns, and a [`CancellationToken`] reaches every
//! in-flight task.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::GateConfig;
use crate::domain::{GateError, Result, SessionError, VersionId, VersionMap, Worker};
use crate::probes::{extract_platform_version, extract_runtime_version};
use crate::session::{ShellConnector, WorkerShell};

const RUNTIME_VERSION_COMMAND: &str = "java -version";
const LOCATE_PLATFORM_COMMAND: &str = "which hadoop";

/// The two aggregated maps produced by one inventory run.
#[derive(Debug)]
pub struct InventoryOutcome {
    pub runtime: VersionMap,
    pub platform: VersionMap,
}

/// One worker's probe result, sent to the aggregator. A failed probe
/// reports the sentinel for both subsystems rather than vanishing, so the
/// reconciler's fatal-bucket check still catches the worker.
struct ProbeReport {
    worker: Worker,
    runtime: VersionId,
    platform: VersionId,
}

/// Probe every worker concurrently and aggregate versions per subsystem.
///
/// Seeds both maps with the master's own measurement, launches one task per
/// worker (capped by `max_sessions` when non-zero), and returns only after
/// every task has finished. Cancelling `cancel` aborts in-flight probing;
/// cancelled workers land in the sentinel bucket.
pub async fn inventory(
    connector: Arc<dyn ShellConnector>,
    config: &GateConfig,
    workers: &[Worker],
    local_runtime: VersionId,
    local_platform: VersionId,
    cancel: CancellationToken,
) -> Result<InventoryOutcome> {
    if workers.is_empty() {
        return Err(GateError::NoWorkers);
    }

    let master = local_host()?;
    let mut runtime_map = VersionMap::seeded(local_runtime, master.clone());
    let mut platform_map = VersionMap::seeded(local_platform, master);

    info!(workers = workers.len(), "checking runtime and platform versions on the workers");

    let limit = match config.max_sessions {
        0 => None,
        n => Some(Arc::new(Semaphore::new(n))),
    };

    let (tx, mut rx) = mpsc::channel::<ProbeReport>(workers.len());
    let mut tasks = JoinSet::new();
    for worker in workers {
        let connector = Arc::clone(&connector);
        let config = config.clone();
        let worker = worker.clone();
        let cancel = cancel.clone();
        let limit = limit.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(worker = %worker, "probe cancelled");
                    ProbeReport {
                        worker: worker.clone(),
                        runtime: VersionId::unrecognized(),
                        platform: VersionId::unrecognized(),
                    }
                }
                report = probe_worker(connector, config, worker.clone()) => report,
            };
            let _ = tx.send(report).await;
        });
    }
    drop(tx);

    // Single aggregator consumes reports while the join barrier drains the
    // task set; inventory returns only once both are done.
    let aggregate = async {
        while let Some(report) = rx.recv().await {
            runtime_map.record(report.runtime, report.worker.clone());
            platform_map.record(report.platform, report.worker);
        }
    };
    let barrier = async {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "probe task aborted");
            }
        }
    };
    tokio::join!(aggregate, barrier);

    debug!(
        runtime_hosts = runtime_map.hosts_total(),
        platform_hosts = platform_map.hosts_total(),
        "inventory aggregation complete"
    );

    Ok(InventoryOutcome {
        runtime: runtime_map,
        platform: platform_map,
    })
}

/// Probe one worker. Session failures are demoted to sentinel entries so a
/// single bad worker cannot block or corrupt the rest of the sweep.
async fn probe_worker(
    connector: Arc<dyn ShellConnector>,
    config: GateConfig,
    worker: Worker,
) -> ProbeReport {
    match version_dialogue(connector.as_ref(), &config, &worker).await {
        Ok((runtime, platform)) => ProbeReport {
            worker,
            runtime,
            platform,
        },
        Err(e) => {
            warn!(worker = %worker, error = %e, "probe failed; recording as unrecognized");
            ProbeReport {
                worker,
                runtime: VersionId::unrecognized(),
                platform: VersionId::unrecognized(),
            }
        }
    }
}

/// The scripted dialogue run against one worker's shell: runtime version,
/// platform tool location (with configured fallback), platform version.
async fn version_dialogue(
    connector: &dyn ShellConnector,
    config: &GateConfig,
    worker: &Worker,
) -> std::result::Result<(VersionId, VersionId), SessionError> {
    let mut shell = connector.open(worker).await?;
    let outcome = run_dialogue(shell.as_mut(), config, worker).await;
    // Close unconditionally so failed probes do not leak connections.
    shell.close().await;
    outcome
}

async fn run_dialogue(
    shell: &mut dyn WorkerShell,
    config: &GateConfig,
    worker: &Worker,
) -> std::result::Result<(VersionId, VersionId), SessionError> {
    let output = shell.run(RUNTIME_VERSION_COMMAND).await?;
    let runtime = extract_runtime_version(&output);
    if runtime.is_unrecognized() {
        warn!(worker = %worker, "runtime version output did not match the expected marker");
    }

    let output = shell.run(LOCATE_PLATFORM_COMMAND).await?;
    let tool_path = match located_path(&output) {
        Some(path) => path,
        None => {
            // "not installed" and "not on PATH" are indistinguishable here;
            // the fallback path settles which one it was.
            debug!(
                worker = %worker,
                fallback = %config.platform_tool_fallback,
                "platform tool not located; using fallback path"
            );
            config.platform_tool_fallback.clone()
        }
    };

    let output = shell.run(&format!("{tool_path} version")).await?;
    let platform = extract_platform_version(&output);
    if platform.is_unrecognized() {
        warn!(worker = %worker, "platform version output did not match the expected marker");
    }

    Ok((runtime, platform))
}

/// First absolute path in `which` output, if the tool was located.
fn located_path(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('/'))
        .map(str::to_string)
}

/// The master's own hostname, used for its pre-seeded map entries.
pub fn local_host() -> Result<Worker> {
    let name = hostname::get()
        .map_err(GateError::Io)?
        .to_string_lossy()
        .into_owned();
    Ok(Worker::new(name))
}
