//! Observer server startup helper for embedding in the controller binary.
//!
//! Provides [`spawn_observer`] which binds the listener eagerly and then
//! serves the Observer API on a background Tokio task, so the HTTP server
//! runs concurrently with the control loop.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// The listener is bound before the task is spawned, so an unusable
/// address or a port already in use is reported to the caller instead of
/// being logged from the background task. The returned [`JoinHandle`]
/// can be aborted during shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or the
/// bind fails.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawns_on_ephemeral_port() {
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
        };
        let handle = spawn_observer(&config, Arc::new(AppState::default()))
            .await
            .unwrap();
        handle.abort();
    }

    #[tokio::test]
    async fn invalid_host_is_reported() {
        let config = ServerConfig {
            host: "nowhere".to_owned(),
            port: 0,
        };
        let result = spawn_observer(&config, Arc::new(AppState::default())).await;
        assert!(matches!(result, Err(StartupError::Server(ServerError::Bind(_)))));
    }
}
