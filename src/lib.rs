//! TCP Chat Server Library
//!
//! A chat server over raw TCP speaking newline-delimited JSON. Clients
//! connect, claim a username, then exchange broadcast and private messages.
//!
//! # Features
//! - Line framing tolerant of arbitrary read boundaries
//! - Username registration with uniqueness among live sessions
//! - Broadcast chat, private messages and a `/users` query
//! - Join/leave notices
//! - Graceful shutdown with a notice to every session
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the `Registry`
//! - Each connection has a `handler` task communicating with the server
//! - `router` decides who receives what; the actor enqueues the results
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use line_chat::listener::{bind, serve};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = bind("127.0.0.1:3000").await.unwrap();
//!     serve(listener, CancellationToken::new()).await;
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use codec::{FrameDecoder, LineCodec};
pub use error::{AppError, DecodeError, ProtocolError, RegistryError};
pub use handler::handle_connection;
pub use message::{Message, MessageType};
pub use registry::Registry;
pub use server::{ChatServer, ServerCommand};
pub use session::Session;
pub use types::{ConnectionId, SessionState};
