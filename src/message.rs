//! Message protocol definitions
//!
//! Every frame on the wire is one JSON object:
//!
//! ```text
//! {"type":"PRIVATE","sender":"alice","recipient":"bob","content":"hi","timestamp":1700000000000}
//! ```
//!
//! Optional fields are omitted when unset. The same shape travels in both
//! directions; which types a client may send is decided by the router.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Content token of a `STATUS` request asking for the user list
pub const USERS_QUERY: &str = "/users";

/// Message type (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Connect,
    Disconnect,
    Chat,
    Broadcast,
    Private,
    Status,
    Error,
}

/// The wire unit
///
/// Fields are private: a message is built once through the constructors or
/// the `with_*` builders and is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    /// Milliseconds since the Unix epoch; 0 when a client omitted it
    #[serde(default)]
    timestamp: i64,
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Message {
    /// Create an empty message of the given type stamped with the current time
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            sender: None,
            recipient: None,
            content: None,
            timestamp: now_millis(),
        }
    }

    /// Chat message from a registered user
    pub fn chat(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageType::Chat)
            .with_sender(sender)
            .with_content(content)
    }

    /// Private message between two users
    pub fn private(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(MessageType::Private)
            .with_sender(sender)
            .with_recipient(recipient)
            .with_content(content)
    }

    /// System status notice
    pub fn status(content: impl Into<String>) -> Self {
        Self::new(MessageType::Status).with_content(content)
    }

    /// Error notice addressed to one session
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageType::Error).with_content(content)
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Content with surrounding whitespace removed, `None` if nothing remains
    pub fn trimmed_content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Convert a refused request into the `ERROR` reply for its sender
impl From<ProtocolError> for Message {
    fn from(err: ProtocolError) -> Self {
        Message::error(err.to_string())
    }
}
