//! Remote session protocol: an authenticated interactive shell to one worker.
//!
//! Authentication uses only locally available key material (no password
//! prompt) and unknown host identities are accepted on first contact —
//! the operator controls the fleet, so trust-on-first-use is acceptable
//! for an operational tool.
//!
//! Command completion is signalled explicitly: every command is sent with a
//! trailing `echo <marker>`, and the reader consumes channel data until the
//! marker line appears, under a per-command deadline and a bounded output
//! ceiling. Carriage returns are stripped before output is handed to the
//! probes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::GateConfig;
use crate::domain::{SessionError, Worker};

/// Marker echoed after every command; its appearance on a line of its own
/// means the command has finished producing output.
const END_OF_COMMAND: &str = "__FLEETGATE_EOC__";

/// Ceiling on bytes captured per command.
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// A live interactive channel to one worker. Owned exclusively by the probe
/// task that opened it; closed unconditionally when that task ends.
#[async_trait]
pub trait WorkerShell: Send {
    /// Run one command and return its decoded output, carriage returns
    /// stripped, truncated at the output ceiling.
    async fn run(&mut self, command: &str) -> Result<String, SessionError>;

    /// Close the session. Idempotent and always safe to call.
    async fn close(&mut self);
}

/// Opens authenticated shells to workers. The seam the inventory engine and
/// credential probe sit on; tests substitute a scripted implementation.
#[async_trait]
pub trait ShellConnector: Send + Sync {
    async fn open(&self, worker: &Worker) -> Result<Box<dyn WorkerShell>, SessionError>;
}

struct Handler;

#[async_trait]
impl client::Handler for Handler {
    type Error = russh::Error;

    // Trust-on-first-use: accept the server key on first contact.
    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// SSH connector: key-based auth, TCP connect under an explicit deadline.
pub struct SshConnector {
    user: String,
    port: u16,
    identity: Option<std::path::PathBuf>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl SshConnector {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            user: config.ssh_user.clone(),
            port: config.ssh_port,
            identity: config.identity.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        }
    }

    async fn load_keys(&self) -> Result<Vec<russh_keys::key::KeyPair>, SessionError> {
        let paths: Vec<std::path::PathBuf> = match &self.identity {
            Some(path) => vec![path.clone()],
            None => {
                let home = dirs::home_dir().ok_or_else(|| SessionError::NoIdentity {
                    detail: "cannot determine home directory".to_string(),
                })?;
                ["id_ed25519", "id_rsa", "id_ecdsa"]
                    .iter()
                    .map(|name| home.join(".ssh").join(name))
                    .collect()
            }
        };

        let mut keys = Vec::new();
        for path in &paths {
            if !path.exists() {
                continue;
            }
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| SessionError::NoIdentity {
                        detail: format!("cannot read {}: {e}", path.display()),
                    })?;
            if let Ok(key) = russh_keys::decode_secret_key(&content, None) {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Err(SessionError::NoIdentity {
                detail: format!(
                    "no decodable key among: {}",
                    paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }
        Ok(keys)
    }
}

#[async_trait]
impl ShellConnector for SshConnector {
    async fn open(&self, worker: &Worker) -> Result<Box<dyn WorkerShell>, SessionError> {
        let host = worker.host.clone();
        let addr = format!("{}:{}", host, self.port);

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SessionError::Timeout {
                host: host.clone(),
                doing: "connecting",
                seconds: self.connect_timeout.as_secs(),
            })?
            .map_err(|e| SessionError::NoRoute {
                host: host.clone(),
                port: self.port,
                detail: e.to_string(),
            })?;

        let config = Arc::new(client::Config {
            inactivity_timeout: Some(self.command_timeout),
            ..Default::default()
        });
        let mut handle = client::connect_stream(config, stream, Handler)
            .await
            .map_err(|e| SessionError::Protocol {
                host: host.clone(),
                detail: e.to_string(),
            })?;

        let mut authenticated = false;
        for key in self.load_keys().await? {
            match handle
                .authenticate_publickey(&self.user, Arc::new(key))
                .await
            {
                Ok(true) => {
                    authenticated = true;
                    break;
                }
                Ok(false) => continue,
                Err(e) => {
                    return Err(SessionError::Protocol {
                        host: host.clone(),
                        detail: e.to_string(),
                    })
                }
            }
        }
        if !authenticated {
            return Err(SessionError::Auth {
                user: self.user.clone(),
                host,
            });
        }

        let mut channel =
            handle
                .channel_open_session()
                .await
                .map_err(|e| SessionError::Protocol {
                    host: host.clone(),
                    detail: e.to_string(),
                })?;
        // Wide pty so long lines are not wrapped by the remote terminal;
        // the pty also merges stderr into the stream, which the runtime
        // version probe depends on.
        channel
            .request_pty(false, "xterm", 800, 50, 0, 0, &[])
            .await
            .map_err(|e| SessionError::Protocol {
                host: host.clone(),
                detail: e.to_string(),
            })?;
        channel
            .request_shell(true)
            .await
            .map_err(|e| SessionError::Protocol {
                host: host.clone(),
                detail: e.to_string(),
            })?;

        let mut shell = SshShell {
            host,
            channel: Some(channel),
            command_timeout: self.command_timeout,
        };
        shell.drain_banner().await;
        debug!(worker = %worker, "session opened");
        Ok(Box::new(shell))
    }
}

/// An open interactive shell over russh.
pub struct SshShell {
    host: String,
    channel: Option<russh::Channel<client::Msg>>,
    command_timeout: Duration,
}

impl SshShell {
    /// Discard the login banner/MOTD: read until the channel goes quiet.
    async fn drain_banner(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        loop {
            match tokio::time::timeout(Duration::from_millis(500), channel.wait()).await {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
    }

    /// Read until the end-of-command marker appears on a line of its own,
    /// the deadline passes, or the output ceiling is hit.
    async fn read_until_marker(&mut self) -> Result<String, SessionError> {
        let host = self.host.clone();
        let channel = self.channel.as_mut().ok_or(SessionError::ChannelClosed {
            host: host.clone(),
        })?;
        let deadline = self.command_timeout;

        let collect = async {
            let mut buf: Vec<u8> = Vec::new();
            loop {
                match channel.wait().await {
                    Some(russh::ChannelMsg::Data { data })
                    | Some(russh::ChannelMsg::ExtendedData { data, .. }) => {
                        buf.extend_from_slice(&data);
                        if buf.len() >= MAX_OUTPUT_BYTES {
                            buf.truncate(MAX_OUTPUT_BYTES);
                            return Ok(buf);
                        }
                        let text = String::from_utf8_lossy(&buf);
                        if text
                            .lines()
                            .any(|line| line.trim() == END_OF_COMMAND)
                        {
                            return Ok(buf);
                        }
                    }
                    Some(russh::ChannelMsg::Eof)
                    | Some(russh::ChannelMsg::ExitStatus { .. }) => continue,
                    Some(russh::ChannelMsg::Close) | None => {
                        return Err(SessionError::ChannelClosed { host: host.clone() })
                    }
                    Some(_) => continue,
                }
            }
        };

        let buf = tokio::time::timeout(deadline, collect)
            .await
            .map_err(|_| SessionError::Timeout {
                host: self.host.clone(),
                doing: "running command",
                seconds: deadline.as_secs(),
            })??;

        Ok(strip_command_framing(&String::from_utf8_lossy(&buf)))
    }
}

#[async_trait]
impl WorkerShell for SshShell {
    async fn run(&mut self, command: &str) -> Result<String, SessionError> {
        let line = format!("{command}; echo {END_OF_COMMAND}\n");
        {
            let channel = self.channel.as_mut().ok_or(SessionError::ChannelClosed {
                host: self.host.clone(),
            })?;
            channel
                .data(line.as_bytes())
                .await
                .map_err(|e| SessionError::Protocol {
                    host: self.host.clone(),
                    detail: e.to_string(),
                })?;
        }
        self.read_until_marker().await
    }

    async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            // Best effort; the transport may already be gone.
            let _ = channel.close().await;
        }
    }
}

/// Normalise captured output: strip carriage returns, drop the pty's echo
/// of the command line and everything from the marker line onward.
fn strip_command_framing(raw: &str) -> String {
    let normalised = raw.replace('\r', "");
    let mut lines = Vec::new();
    for line in normalised.lines() {
        if line.trim() == END_OF_COMMAND {
            break;
        }
        // The pty echoes the sent command line back; it carries the marker
        // in its `echo` tail, so it is recognisable and dropped.
        if line.contains(END_OF_COMMAND) {
            continue;
        }
        lines.push(line);
    }
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_strips_carriage_returns() {
        let raw = format!("line one\r\nline two\r\n{END_OF_COMMAND}\r\n");
        let out = strip_command_framing(&raw);
        assert_eq!(out, "line one\nline two\n");
    }

    #[test]
    fn test_framing_drops_echoed_command_line() {
        let raw = format!(
            "java -version; echo {END_OF_COMMAND}\nopenjdk version \"1.8.0\"\n{END_OF_COMMAND}\n$ "
        );
        let out = strip_command_framing(&raw);
        assert_eq!(out, "openjdk version \"1.8.0\"\n");
    }

    #[test]
    fn test_framing_stops_at_marker_line() {
        let raw = format!("before\n{END_OF_COMMAND}\nafter\n");
        let out = strip_command_framing(&raw);
        assert_eq!(out, "before\n");
    }

    #[test]
    fn test_framing_empty_output_stays_empty() {
        let raw = format!("{END_OF_COMMAND}\n");
        assert_eq!(strip_command_framing(&raw), "");
    }
}
