//! Error taxonomy for the pre-flight gate.
//!
//! Every fatal condition aborts the whole run with a descriptive,
//! single-purpose message and a non-zero exit — the tool is a gate, not a
//! best-effort reporter. Session-layer failures get their own type so the
//! credential probe can classify them into actionable messages.

use crate::domain::version::SubsystemKind;

/// Errors produced by the remote session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// TCP/SSH connect failed with no valid route or refused port.
    #[error("no valid connection to {host}:{port}: {detail}")]
    NoRoute {
        host: String,
        port: u16,
        detail: String,
    },

    /// The server rejected every offered key.
    #[error("authentication failed for user '{user}' on {host}")]
    Auth { user: String, host: String },

    /// No usable private key was found locally.
    #[error("no usable SSH key found (looked under ~/.ssh): {detail}")]
    NoIdentity { detail: String },

    /// A network-facing call exceeded its deadline.
    #[error("timed out after {seconds}s while {doing} on {host}")]
    Timeout {
        host: String,
        doing: &'static str,
        seconds: u64,
    },

    /// The channel died mid-command.
    #[error("session channel to {host} closed before command completed")]
    ChannelClosed { host: String },

    /// Underlying SSH protocol error.
    #[error("ssh protocol error on {host}: {detail}")]
    Protocol { host: String, detail: String },
}

/// Fatal pre-flight conditions, one variant per actionable message.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(
        "no workers configured; populate the workers file (one hostname per \
         line, typically /usr/local/hadoop/etc/hadoop/slaves)"
    )]
    NoWorkers,

    #[error(
        "the following hosts are unknown: {}; add these hostnames and their \
         addresses to /etc/hosts", .hosts.join(", ")
    )]
    UnresolvableHosts { hosts: Vec<String> },

    #[error("cannot ping {}; check connectivity to these nodes", .hosts.join(", "))]
    UnreachableHosts { hosts: Vec<String> },

    #[error(
        "{source}\nthis means that either:\n\
         1. the username on this host does not match the one on {host}; create a matching user, or\n\
         2. SSH keys have not been installed on {host}; copy this host's public key over"
    )]
    AuthenticationFailure { host: String, source: SessionError },

    #[error("{source}\ncheck that SSH is enabled on {host}")]
    NoRoute { host: String, source: SessionError },

    #[error(
        "check the {} installation on these nodes: {}",
        .subsystem.label(),
        .hosts.join(", ")
    )]
    IncompatibleInstallation {
        subsystem: SubsystemKind,
        hosts: Vec<String>,
    },

    #[error("{hint}")]
    MissingTool { tool: String, hint: String },

    #[error(
        "clock skew on {} exceeds the {threshold_ms}ms threshold; consider \
         using NTP to synchronise time across the cluster", .hosts.join(", ")
    )]
    ClockSkewExceeded {
        hosts: Vec<String>,
        threshold_ms: i64,
    },

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
