//! TCP connection handler
//!
//! Handles one client connection: frames the byte stream with `LineCodec`,
//! forwards decoded frames to the ChatServer and writes queued messages back.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::LineCodec;
use crate::error::AppError;
use crate::message::Message;
use crate::server::ServerCommand;
use crate::types::ConnectionId;

/// How long a closing connection may spend flushing queued messages
const WRITE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle a new TCP connection
///
/// Registers the connection with the ChatServer, pumps frames in both
/// directions and always reports the disconnect, whether the peer closed,
/// the socket failed or `shutdown` fired.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let id = ConnectionId::from(stream.peer_addr()?);
    let (mut sink, mut frames) = Framed::new(stream, LineCodec::new()).split();

    // Channel for server -> connection messages
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Message>();
    // Identifies this connection's session when it disconnects
    let owner = msg_tx.downgrade();

    if cmd_tx
        .send(ServerCommand::Connect {
            id: id.clone(),
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register connection {} - server closed", id);
        return Err(AppError::ChannelSend);
    }

    // Write task (queued Message -> socket)
    let write_id = id.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if let Err(e) = sink.send(msg).await {
                debug!("Write to {} failed: {}", write_id, e);
                break;
            }
        }
        let _ = sink.close().await;
        debug!("Write task ended for {}", write_id);
    });

    // Read loop (socket -> ServerCommand)
    let mut write_finished = false;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Shutdown requested, closing {}", id);
                break;
            }
            _ = &mut write_task => {
                write_finished = true;
                break;
            }
            frame = frames.next() => match frame {
                Some(Ok(frame)) => {
                    let cmd = ServerCommand::Inbound { id: id.clone(), frame };
                    if cmd_tx.send(cmd).await.is_err() {
                        debug!("Server closed, ending read loop for {}", id);
                        break;
                    }
                }
                Some(Err(e)) => {
                    error!("Transport error on {}: {}", id, e);
                    break;
                }
                None => {
                    debug!("Peer {} closed the connection", id);
                    break;
                }
            },
        }
    }

    // Removing the session closes its queue, which ends the write task.
    let _ = cmd_tx
        .send(ServerCommand::Disconnect {
            id: id.clone(),
            owner,
        })
        .await;

    if !write_finished {
        match tokio::time::timeout(WRITE_DRAIN_TIMEOUT, &mut write_task).await {
            Ok(_) => {}
            Err(_) => {
                warn!("Write task for {} did not drain in time", id);
                write_task.abort();
            }
        }
    }

    info!("Connection {} closed", id);

    Ok(())
}
