//! Session struct definition
//!
//! Server-side state of one live connection: its id, its username and the
//! outbound queue drained by the connection's write task.

use tokio::sync::mpsc;

use crate::error::AppError;
use crate::message::Message;
use crate::types::{ConnectionId, SessionState};

/// Connected session information
///
/// The username starts out equal to the connection id, which marks the
/// session as unregistered. It changes exactly once, through
/// `Registry::rename_unregistered_to_named`.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    username: String,
    /// Server → connection message queue
    sender: mpsc::UnboundedSender<Message>,
}

impl Session {
    /// Create a new unregistered session with the given id and outbound queue
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<Message>) -> Self {
        let username = id.as_str().to_string();
        Self {
            id,
            username,
            sender,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Current username (the connection id while unregistered)
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> SessionState {
        if self.username == self.id.as_str() {
            SessionState::Unregistered
        } else {
            SessionState::Registered
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state() == SessionState::Registered
    }

    /// Queue a message for this session
    ///
    /// Never blocks. Fails only when the connection's write task is gone.
    pub fn send(&self, msg: Message) -> Result<(), AppError> {
        self.sender.send(msg).map_err(|_| AppError::ChannelSend)
    }

    /// Whether `sender` feeds this session's outbound queue
    pub fn owns(&self, sender: &mpsc::UnboundedSender<Message>) -> bool {
        self.sender.same_channel(sender)
    }

    /// Only the registry may rename a session.
    pub(crate) fn set_username(&mut self, username: String) {
        self.username = username;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_creation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(ConnectionId::new("127.0.0.1:4000"), tx);

        assert_eq!(session.username(), "127.0.0.1:4000");
        assert_eq!(session.state(), SessionState::Unregistered);
        assert!(!session.is_registered());
    }

    #[tokio::test]
    async fn test_session_username() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = Session::new(ConnectionId::new("127.0.0.1:4000"), tx);

        session.set_username("alice".to_string());

        assert!(session.is_registered());
        assert_eq!(session.username(), "alice");
    }

    #[tokio::test]
    async fn test_session_send() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new(ConnectionId::new("127.0.0.1:4000"), tx);

        session.send(Message::status("hi")).unwrap();
        assert_eq!(rx.recv().await.unwrap().content(), Some("hi"));

        drop(rx);
        assert!(session.send(Message::status("gone")).is_err());
    }

    #[tokio::test]
    async fn test_session_owns_its_queue_only() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (other_tx, _other_rx) = mpsc::unbounded_channel();
        let session = Session::new(ConnectionId::new("127.0.0.1:4000"), tx.clone());

        assert!(session.owns(&tx));
        assert!(!session.owns(&other_tx));
    }
}
