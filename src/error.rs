//! Error types for the chat server
//!
//! Split by where an error is recovered:
//! - `DecodeError` and `ProtocolError` are answered with an `ERROR` message
//!   and the connection stays open.
//! - `RegistryError` is raised by registry mutations and mapped to a
//!   `ProtocolError` by the router.
//! - `AppError` is fatal to a single connection (or to startup on bind).
//!
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Transport failures end the affected connection only; a bind failure ends
/// the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal to the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error on an outbound message
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel send error (fatal - the server actor is gone)
    #[error("Channel send error")]
    ChannelSend,

    /// The client gave up reconnecting
    #[error("could not reach the server after {0} attempt(s)")]
    ReconnectExhausted(u32),

    /// The listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A frame that could not be turned into a `Message`
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not a JSON object with the expected fields
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Well-formed requests the server refuses
///
/// Each variant renders as the text of the `ERROR` message sent back to the
/// originating session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The frame could not be decoded
    #[error("invalid message format")]
    InvalidMessage,

    /// Another live session already uses this name
    #[error("username already in use")]
    UsernameTaken,

    /// Registration frame carried no usable name
    #[error("username must not be empty")]
    EmptyUsername,

    /// Name contains whitespace or a comma
    #[error("username must not contain spaces or commas")]
    InvalidUsername,

    /// Another live connection already has this id
    #[error("connection id already in use")]
    ConnectionInUse,

    /// Type not accepted from clients
    #[error("unsupported message type")]
    UnsupportedType,

    /// PRIVATE without recipient or content
    #[error("private message requires a recipient and content")]
    MissingPrivateFields,

    /// PRIVATE addressed to nobody we know
    #[error("user '{0}' not found")]
    RecipientNotFound(String),

    /// CHAT without text
    #[error("message content must not be empty")]
    EmptyContent,

    /// STATUS with a query other than `/users`
    #[error("unknown status query")]
    UnknownStatusQuery,
}

/// Registry mutation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The requested name collides with a live session
    #[error("username already in use: {0}")]
    UsernameTaken(String),

    /// The requested name is empty after trimming
    #[error("username is empty")]
    EmptyUsername,

    /// The requested name contains whitespace or a comma
    #[error("username contains whitespace or a comma: {0}")]
    InvalidUsername(String),

    /// No session with this connection id
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    /// The session already left the unregistered state
    #[error("session already registered: {0}")]
    AlreadyRegistered(String),
}

impl From<DecodeError> for ProtocolError {
    fn from(_: DecodeError) -> Self {
        ProtocolError::InvalidMessage
    }
}

impl From<RegistryError> for ProtocolError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::EmptyUsername => ProtocolError::EmptyUsername,
            RegistryError::InvalidUsername(_) => ProtocolError::InvalidUsername,
            // A session can only reach registration while unregistered, so the
            // remaining cases collapse into the collision answer.
            RegistryError::UsernameTaken(_)
            | RegistryError::UnknownConnection(_)
            | RegistryError::AlreadyRegistered(_) => ProtocolError::UsernameTaken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_text() {
        assert_eq!(
            ProtocolError::RecipientNotFound("carol".to_string()).to_string(),
            "user 'carol' not found"
        );
        assert_eq!(
            ProtocolError::UsernameTaken.to_string(),
            "username already in use"
        );
        assert_eq!(
            ProtocolError::InvalidMessage.to_string(),
            "invalid message format"
        );
    }

    #[test]
    fn test_registry_error_maps_to_protocol_error() {
        let err: ProtocolError = RegistryError::UsernameTaken("alice".into()).into();
        assert_eq!(err, ProtocolError::UsernameTaken);

        let err: ProtocolError = RegistryError::EmptyUsername.into();
        assert_eq!(err, ProtocolError::EmptyUsername);

        let err: ProtocolError = RegistryError::InvalidUsername("a b".into()).into();
        assert_eq!(err, ProtocolError::InvalidUsername);
    }
}
