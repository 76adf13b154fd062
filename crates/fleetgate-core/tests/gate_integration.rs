//! Integration tests for the inventory engine against a scripted shell
//! connector, exercising the full fan-out / aggregate / reconcile / report
//! flow without any network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use fleetgate_core::{
    inventory, local_host, reconcile, render_version_report, GateConfig, GateError, SessionError,
    ShellConnector, SubsystemKind, VersionId, Worker, WorkerShell,
};

/// What one scripted worker answers per command.
#[derive(Clone)]
struct Script {
    runtime_output: String,
    which_output: String,
    platform_output: String,
}

impl Script {
    fn healthy(runtime: &str, platform: &str) -> Self {
        Self {
            runtime_output: format!("openjdk version \"{runtime}\"\nOpenJDK Runtime Environment\n"),
            which_output: "/usr/local/hadoop/bin/hadoop\n".to_string(),
            platform_output: format!("Hadoop {platform}\nCompiled by jenkins\n"),
        }
    }

    fn nothing_installed() -> Self {
        Self {
            runtime_output: "bash: java: command not found\n".to_string(),
            which_output: String::new(),
            platform_output: "bash: /usr/local/hadoop/bin/hadoop: No such file or directory\n"
                .to_string(),
        }
    }
}

struct ScriptedShell {
    script: Script,
}

#[async_trait]
impl WorkerShell for ScriptedShell {
    async fn run(&mut self, command: &str) -> Result<String, SessionError> {
        if command.starts_with("java") {
            Ok(self.script.runtime_output.clone())
        } else if command.starts_with("which") {
            Ok(self.script.which_output.clone())
        } else {
            Ok(self.script.platform_output.clone())
        }
    }

    async fn close(&mut self) {}
}

/// Scripted connector: per-host scripts, unknown hosts refuse the connect.
struct ScriptedConnector {
    scripts: HashMap<String, Script>,
}

impl ScriptedConnector {
    fn new(scripts: impl IntoIterator<Item = (&'static str, Script)>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(host, script)| (host.to_string(), script))
                .collect(),
        }
    }
}

#[async_trait]
impl ShellConnector for ScriptedConnector {
    async fn open(&self, worker: &Worker) -> Result<Box<dyn WorkerShell>, SessionError> {
        match self.scripts.get(&worker.host) {
            Some(script) => Ok(Box::new(ScriptedShell {
                script: script.clone(),
            })),
            None => Err(SessionError::NoRoute {
                host: worker.host.clone(),
                port: 22,
                detail: "connection refused".to_string(),
            }),
        }
    }
}

fn workers(hosts: &[&str]) -> Vec<Worker> {
    hosts.iter().map(|host| Worker::new(*host)).collect()
}

#[tokio::test]
async fn test_inventory_totals_equal_workers_plus_master() {
    let connector = Arc::new(ScriptedConnector::new([
        ("w1", Script::healthy("8", "2.7.3")),
        ("w2", Script::healthy("8", "2.7.3")),
        ("w3", Script::healthy("11", "3.3.6")),
    ]));
    let outcome = inventory(
        connector,
        &GateConfig::default(),
        &workers(&["w1", "w2", "w3"]),
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        CancellationToken::new(),
    )
    .await
    .expect("inventory");

    assert_eq!(outcome.runtime.hosts_total(), 4);
    assert_eq!(outcome.platform.hosts_total(), 4);
}

#[tokio::test]
async fn test_inventory_groups_versions_with_master_in_local_bucket() {
    let connector = Arc::new(ScriptedConnector::new([
        ("w1", Script::healthy("8", "2.7.3")),
        ("w2", Script::healthy("8", "2.7.3")),
        ("w3", Script::healthy("11", "2.7.3")),
    ]));
    let outcome = inventory(
        connector,
        &GateConfig::default(),
        &workers(&["w1", "w2", "w3"]),
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        CancellationToken::new(),
    )
    .await
    .expect("inventory");

    let master = local_host().expect("hostname");
    let eights = outcome
        .runtime
        .hosts_for(&VersionId::new("8"))
        .expect("bucket 8");
    assert_eq!(eights.len(), 3);
    assert!(eights.contains(&master));
    assert!(eights.contains(&Worker::new("w1")));
    assert!(eights.contains(&Worker::new("w2")));

    let elevens = outcome
        .runtime
        .hosts_for(&VersionId::new("11"))
        .expect("bucket 11");
    assert_eq!(elevens.len(), 1);
    assert!(elevens.contains(&Worker::new("w3")));
}

#[tokio::test]
async fn test_unmatched_output_lands_in_sentinel_bucket_and_fails_reconcile() {
    let connector = Arc::new(ScriptedConnector::new([
        ("w1", Script::healthy("8", "2.7.3")),
        ("w2", Script::nothing_installed()),
    ]));
    let outcome = inventory(
        connector,
        &GateConfig::default(),
        &workers(&["w1", "w2"]),
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        CancellationToken::new(),
    )
    .await
    .expect("inventory");

    let sentinel: Vec<String> = outcome
        .runtime
        .unrecognized_hosts()
        .iter()
        .map(|w| w.host.clone())
        .collect();
    assert_eq!(sentinel, vec!["w2".to_string()]);

    let err = reconcile(SubsystemKind::Runtime, &outcome.runtime).expect_err("must fail");
    assert!(matches!(
        err,
        GateError::IncompatibleInstallation {
            subsystem: SubsystemKind::Runtime,
            ..
        }
    ));
    assert!(err.to_string().contains("w2"));
}

#[tokio::test]
async fn test_connection_failure_is_recorded_not_lost() {
    // "unroutable" has no script, so the connector refuses it.
    let connector = Arc::new(ScriptedConnector::new([("w1", Script::healthy("8", "2.7.3"))]));
    let outcome = inventory(
        connector,
        &GateConfig::default(),
        &workers(&["w1", "unroutable"]),
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        CancellationToken::new(),
    )
    .await
    .expect("inventory");

    // Both maps still account for every probed worker plus the master.
    assert_eq!(outcome.runtime.hosts_total(), 3);
    assert_eq!(outcome.platform.hosts_total(), 3);
    assert_eq!(outcome.platform.unrecognized_hosts().len(), 1);
    assert!(reconcile(SubsystemKind::Platform, &outcome.platform).is_err());
}

#[tokio::test]
async fn test_cancelled_run_demotes_all_workers_to_sentinel() {
    let connector = Arc::new(ScriptedConnector::new([
        ("w1", Script::healthy("8", "2.7.3")),
        ("w2", Script::healthy("8", "2.7.3")),
    ]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = inventory(
        connector,
        &GateConfig::default(),
        &workers(&["w1", "w2"]),
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        cancel,
    )
    .await
    .expect("inventory still joins");

    assert_eq!(outcome.runtime.hosts_total(), 3);
    assert_eq!(outcome.runtime.unrecognized_hosts().len(), 2);
}

#[tokio::test]
async fn test_empty_worker_set_is_fatal() {
    let connector = Arc::new(ScriptedConnector::new([]));
    let result = inventory(
        connector,
        &GateConfig::default(),
        &[],
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(GateError::NoWorkers)));
}

#[tokio::test]
async fn test_session_cap_still_probes_every_worker() {
    let connector = Arc::new(ScriptedConnector::new([
        ("w1", Script::healthy("8", "2.7.3")),
        ("w2", Script::healthy("8", "2.7.3")),
        ("w3", Script::healthy("8", "2.7.3")),
        ("w4", Script::healthy("8", "2.7.3")),
    ]));
    let config = GateConfig {
        max_sessions: 2,
        ..GateConfig::default()
    };
    let outcome = inventory(
        connector,
        &config,
        &workers(&["w1", "w2", "w3", "w4"]),
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        CancellationToken::new(),
    )
    .await
    .expect("inventory");

    assert_eq!(outcome.runtime.hosts_total(), 5);
    assert!(outcome.runtime.unrecognized_hosts().is_empty());
}

#[tokio::test]
async fn test_rendered_report_reflects_aggregate_not_insertion_order() {
    let connector = Arc::new(ScriptedConnector::new([
        ("beta", Script::healthy("8", "2.7.3")),
        ("alpha", Script::healthy("8", "2.7.3")),
    ]));
    let outcome = inventory(
        connector,
        &GateConfig::default(),
        &workers(&["beta", "alpha"]),
        VersionId::new("8"),
        VersionId::new("2.7.3"),
        CancellationToken::new(),
    )
    .await
    .expect("inventory");

    let rendered = render_version_report(&outcome.platform);
    let alpha_at = rendered.find("alpha").expect("alpha listed");
    let beta_at = rendered.find("beta").expect("beta listed");
    assert!(alpha_at < beta_at, "hosts must be lexicographically sorted");
}
