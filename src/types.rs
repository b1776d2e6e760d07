//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: identifier derived from the remote endpoint
//! - `SessionState`: registration state of a connection

use std::net::SocketAddr;

/// Unique connection identifier (newtype pattern)
///
/// Derived from the peer address (`ip:port`) at accept time. The OS never
/// hands out the same remote endpoint twice to live connections, so the id is
/// unique while the session is alive. It doubles as the "unregistered"
/// username sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection id from an arbitrary label
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for ConnectionId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registration state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Username still equals the connection id; next frame is a registration attempt
    Unregistered,
    /// Username chosen; frames are dispatched by their declared type
    Registered,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_from_socket_addr() {
        let addr: SocketAddr = "127.0.0.1:54321".parse().unwrap();
        let id = ConnectionId::from(addr);
        assert_eq!(id.as_str(), "127.0.0.1:54321");
        assert_eq!(id.to_string(), "127.0.0.1:54321");
    }

    #[test]
    fn test_connection_id_equality() {
        assert_eq!(ConnectionId::new("a:1"), ConnectionId::new("a:1"));
        assert_ne!(ConnectionId::new("a:1"), ConnectionId::new("a:2"));
    }
}
