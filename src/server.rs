//! ChatServer Actor implementation
//!
//! The central actor that owns the `Registry`. Connection handlers never touch
//! session state directly; they send `ServerCommand`s over an mpsc channel and
//! the actor processes them one at a time. This serializes registration, so
//! the first of two racing claims on a username wins.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::DecodeError;
use crate::message::Message;
use crate::registry::Registry;
use crate::router::{self, Delivery, SHUTDOWN_NOTICE};
use crate::session::Session;
use crate::types::ConnectionId;

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted
    Connect {
        id: ConnectionId,
        sender: mpsc::UnboundedSender<Message>,
    },
    /// One frame read from a connection (or why it failed to decode)
    Inbound {
        id: ConnectionId,
        frame: Result<Message, DecodeError>,
    },
    /// Connection closed or failed
    ///
    /// `owner` is the closing connection's outbound queue, so a late
    /// disconnect never removes a session that another connection now holds.
    Disconnect {
        id: ConnectionId,
        owner: mpsc::WeakUnboundedSender<Message>,
    },
    /// Notify every session, drop them all and stop the actor
    Shutdown,
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All live sessions
    registry: Registry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Processes commands until `Shutdown` arrives or all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            let stop = matches!(cmd, ServerCommand::Shutdown);
            self.handle_command(cmd);
            if stop {
                break;
            }
        }

        info!("ChatServer stopped");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        let deliveries = match cmd {
            ServerCommand::Connect { id, sender } => {
                info!("Session {} opened", id);
                router::connect(&mut self.registry, Session::new(id, sender))
            }
            ServerCommand::Inbound { id, frame } => router::route(&mut self.registry, &id, frame),
            ServerCommand::Disconnect { id, owner } => {
                if !self.owned_by(&id, &owner) {
                    debug!("Ignoring disconnect of {} from a stale connection", id);
                    return;
                }
                info!("Session {} closed", id);
                router::disconnect(&mut self.registry, &id)
            }
            ServerCommand::Shutdown => {
                self.handle_shutdown();
                Vec::new()
            }
        };
        self.deliver(deliveries);
    }

    /// Whether the live session under `id` is fed by `owner`
    fn owned_by(&self, id: &ConnectionId, owner: &mpsc::WeakUnboundedSender<Message>) -> bool {
        let (Some(session), Some(owner)) = (self.registry.get(id), owner.upgrade()) else {
            return false;
        };
        session.owns(&owner)
    }

    /// Enqueue each delivery on its session's outbound queue
    fn deliver(&self, deliveries: Vec<Delivery>) {
        for Delivery { to, message } in deliveries {
            let Some(session) = self.registry.get(&to) else {
                continue;
            };
            if session.send(message).is_err() {
                // Write task already gone; its Disconnect is on the way.
                debug!("Dropping message for closed session {}", to);
            }
        }
    }

    /// Tell everyone we are going away, then release every session
    ///
    /// Dropping a session closes its outbound queue, which lets the write task
    /// flush and close the socket.
    fn handle_shutdown(&mut self) {
        let sessions = self.registry.drain();
        info!("Shutting down {} session(s)", sessions.len());
        for session in sessions {
            let _ = session.send(Message::status(SHUTDOWN_NOTICE));
        }
    }
}
