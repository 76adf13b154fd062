//! Fleetgate Core Library
//!
//! Pre-flight validation for a compute cluster's worker nodes, run from the
//! coordinator before distributed services start. Re-exports the check
//! stages for programmatic access.

pub mod config;
pub mod credentials;
pub mod domain;
pub mod inventory;
pub mod local;
pub mod members;
pub mod probes;
pub mod reachability;
pub mod reconcile;
pub mod report;
pub mod session;
pub mod skew;
pub mod telemetry;

pub use config::GateConfig;
pub use credentials::verify_credentials;
pub use domain::{GateError, Result, SessionError, SubsystemKind, VersionId, VersionMap, Worker};
pub use inventory::{inventory, local_host, InventoryOutcome};
pub use local::{local_platform_version, local_runtime_version};
pub use members::{FileMemberSource, MemberSource, StaticMemberSource};
pub use probes::{extract_platform_version, extract_runtime_version};
pub use reachability::{classify_ping, ping_sweep, Reachability};
pub use reconcile::reconcile;
pub use report::{render_version_report, write_version_report};
pub use session::{ShellConnector, SshConnector, WorkerShell};
pub use skew::{measure_skew, parse_clockdiff_delta, SkewEntry, SkewReport};
pub use telemetry::init_tracing;

/// Fleetgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
