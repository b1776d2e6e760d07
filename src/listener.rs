//! Server listener
//!
//! Binds the TCP listener, accepts connections and runs graceful shutdown:
//! stop accepting, let the ChatServer notify and release every session, then
//! wait (bounded) for the connection tasks to finish.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::handler::handle_connection;
use crate::server::{ChatServer, ServerCommand};

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Upper bound on waiting for connections to close during shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Bind the listening socket
pub async fn bind(addr: &str) -> Result<TcpListener, AppError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accept connections until `shutdown` is cancelled
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) {
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let server = tokio::spawn(ChatServer::new(cmd_rx).run());

    let tracker = TaskTracker::new();
    let connections = CancellationToken::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let cmd_tx = cmd_tx.clone();
                    let token = connections.clone();
                    tracker.spawn(async move {
                        if let Err(e) = handle_connection(stream, cmd_tx, token).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
        }
    }

    info!("Shutting down, no longer accepting connections");
    drop(listener);

    let _ = cmd_tx.send(ServerCommand::Shutdown).await;
    drop(cmd_tx);
    if let Err(e) = server.await {
        error!("ChatServer task failed: {}", e);
    }

    connections.cancel();
    tracker.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait())
        .await
        .is_err()
    {
        warn!("{} connection(s) still open after grace period", tracker.len());
    }

    info!("Server stopped");
}

/// Wait for SIGINT or SIGTERM (Ctrl+C elsewhere)
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
