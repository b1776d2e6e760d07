//! Message routing
//!
//! Turns one event (a connection arriving, a decoded frame, a connection
//! leaving) into the list of messages to enqueue and the sessions they go to.
//! Routing only reads and mutates the `Registry`; the caller performs the
//! actual sends.
//!
//! The client-supplied `sender` is never trusted: every relayed message is
//! rebuilt with the registered username of its origin and a fresh timestamp.

use tracing::{debug, info, warn};

use crate::error::{DecodeError, ProtocolError};
use crate::message::{Message, MessageType, USERS_QUERY};
use crate::registry::Registry;
use crate::session::Session;
use crate::types::ConnectionId;

/// Greeting sent to every new connection
pub const WELCOME: &str = "welcome! send your username to join the chat";

/// Start of the confirmation sent after a successful registration
pub const USERNAME_SET_PREFIX: &str = "username set to ";

/// Notice sent to every session when the server stops
pub const SHUTDOWN_NOTICE: &str = "server is shutting down";

/// One message bound for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub message: Message,
}

impl Delivery {
    pub fn new(to: ConnectionId, message: Message) -> Self {
        Self { to, message }
    }

    fn reply(to: &ConnectionId, err: ProtocolError) -> Self {
        Self::new(to.clone(), err.into())
    }
}

/// Add an accepted connection and greet it
///
/// A connection whose id is still held by a live session is refused: it gets
/// one error on its own queue and is dropped, which closes that queue.
pub fn connect(registry: &mut Registry, session: Session) -> Vec<Delivery> {
    let id = session.id().clone();
    if let Err(rejected) = registry.insert(session) {
        warn!("Connection id {} reused while still live, refusing", id);
        let _ = rejected.send(ProtocolError::ConnectionInUse.into());
        return Vec::new();
    }
    debug!("Live sessions: {}", registry.len());
    vec![Delivery::new(id, Message::status(WELCOME))]
}

/// Remove a session and announce the departure if it was registered
///
/// Idempotent: a second call for the same id yields nothing.
pub fn disconnect(registry: &mut Registry, id: &ConnectionId) -> Vec<Delivery> {
    let Some(session) = registry.remove(id) else {
        return Vec::new();
    };
    debug!("Live sessions: {}", registry.len());

    if !session.is_registered() {
        return Vec::new();
    }

    info!("User '{}' ({}) left", session.username(), id);
    let left = Message::status(format!("{} left the chat", session.username()));
    registry
        .iter()
        .map(|s| Delivery::new(s.id().clone(), left.clone()))
        .collect()
}

/// Route one inbound frame from `origin`
pub fn route(
    registry: &mut Registry,
    origin: &ConnectionId,
    inbound: Result<Message, DecodeError>,
) -> Vec<Delivery> {
    let Some(session) = registry.get(origin) else {
        debug!("Dropping frame from unknown connection {}", origin);
        return Vec::new();
    };

    let message = match inbound {
        Ok(message) => message,
        Err(e) => {
            warn!("Invalid frame from {}: {}", origin, e);
            return vec![Delivery::reply(origin, e.into())];
        }
    };

    let result = if session.is_registered() {
        dispatch(registry, origin, &message)
    } else {
        register(registry, origin, &message)
    };

    result.unwrap_or_else(|err| {
        debug!("Rejected {:?} from {}: {}", message.kind(), origin, err);
        vec![Delivery::reply(origin, err)]
    })
}

/// First frames of an unregistered session: content is the wanted username
fn register(
    registry: &mut Registry,
    origin: &ConnectionId,
    message: &Message,
) -> Result<Vec<Delivery>, ProtocolError> {
    let candidate = message
        .trimmed_content()
        .ok_or(ProtocolError::EmptyUsername)?;
    let username = registry
        .rename_unregistered_to_named(origin, candidate)?
        .username()
        .to_string();

    info!("Connection {} registered as '{}'", origin, username);

    let mut deliveries = vec![Delivery::new(
        origin.clone(),
        Message::status(format!("{}{}", USERNAME_SET_PREFIX, username)),
    )];
    let joined = Message::status(format!("{} joined the chat", username));
    deliveries.extend(
        registry
            .iter()
            .filter(|s| s.id() != origin)
            .map(|s| Delivery::new(s.id().clone(), joined.clone())),
    );
    Ok(deliveries)
}

/// Frames of a registered session, by declared type
fn dispatch(
    registry: &Registry,
    origin: &ConnectionId,
    message: &Message,
) -> Result<Vec<Delivery>, ProtocolError> {
    let Some(session) = registry.get(origin) else {
        return Ok(Vec::new());
    };
    let username = session.username();

    match message.kind() {
        MessageType::Chat => {
            let content = message
                .content()
                .filter(|c| !c.trim().is_empty())
                .ok_or(ProtocolError::EmptyContent)?;
            let chat = Message::chat(username, content);
            Ok(registry
                .iter()
                .filter(|s| s.is_registered() && s.id() != origin)
                .map(|s| Delivery::new(s.id().clone(), chat.clone()))
                .collect())
        }
        MessageType::Private => {
            let recipient = message.recipient().map(str::trim).filter(|r| !r.is_empty());
            let content = message.content().filter(|c| !c.trim().is_empty());
            let (Some(recipient), Some(content)) = (recipient, content) else {
                return Err(ProtocolError::MissingPrivateFields);
            };
            let target = registry
                .find_by_username(recipient)
                .ok_or_else(|| ProtocolError::RecipientNotFound(recipient.to_string()))?;

            debug!("Private message {} -> {}", username, recipient);
            Ok(vec![
                Delivery::new(
                    target.id().clone(),
                    Message::private(username, recipient, content),
                ),
                Delivery::new(
                    origin.clone(),
                    Message::status(format!("private message delivered to {}", recipient)),
                ),
            ])
        }
        MessageType::Status => {
            if message.trimmed_content() != Some(USERS_QUERY) {
                return Err(ProtocolError::UnknownStatusQuery);
            }
            let users = registry.list_usernames().join(", ");
            Ok(vec![Delivery::new(origin.clone(), Message::status(users))])
        }
        MessageType::Connect
        | MessageType::Disconnect
        | MessageType::Broadcast
        | MessageType::Error => Err(ProtocolError::UnsupportedType),
    }
}
