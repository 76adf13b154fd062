//! Credential probe: one connect-and-classify attempt per worker before
//! the inventory sweep. Success is silent.

use tracing::debug;

use crate::domain::{GateError, Result, SessionError, Worker};
use crate::session::ShellConnector;

/// Open and immediately close a session to each worker, mapping failures
/// to their actionable messages. The run aborts on the first failing host.
pub async fn verify_credentials(connector: &dyn ShellConnector, workers: &[Worker]) -> Result<()> {
    for worker in workers {
        match connector.open(worker).await {
            Ok(mut shell) => {
                shell.close().await;
                debug!(worker = %worker, "credentials accepted");
            }
            Err(source @ SessionError::Auth { .. }) => {
                return Err(GateError::AuthenticationFailure {
                    host: worker.host.clone(),
                    source,
                });
            }
            Err(source @ (SessionError::NoRoute { .. } | SessionError::Timeout { .. })) => {
                return Err(GateError::NoRoute {
                    host: worker.host.clone(),
                    source,
                });
            }
            Err(source) => return Err(GateError::Session(source)),
        }
    }
    Ok(())
}
