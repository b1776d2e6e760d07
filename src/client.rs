//! Terminal chat client
//!
//! Reads lines from stdin and turns them into protocol frames:
//!
//! - the first line (or `--username`) claims a username
//! - `/users` lists who is online
//! - `/msg <user> <text>` sends a private message
//! - `/quit` or `/exit` leaves
//! - anything else is a chat message
//!
//! Incoming messages are printed one per line. When the connection drops the
//! client reconnects with a linearly growing delay and claims its username
//! again.

use std::time::Duration;

use chrono::{DateTime, Local};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::LineCodec;
use crate::config::{DEFAULT_HOST, DEFAULT_PORT};
use crate::error::AppError;
use crate::message::{Message, MessageType, USERS_QUERY};
use crate::router::USERNAME_SET_PREFIX;

const MSG_USAGE: &str = "usage: /msg <user> <text>";

/// Client options
#[derive(Parser, Debug, Clone)]
#[command(name = "line_chat_client")]
#[command(about = "Terminal client for the line_chat server", long_about = None)]
pub struct ClientConfig {
    /// Server host
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Username to claim right after connecting
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// How many times to retry after losing the connection
    #[arg(long, default_value_t = 5)]
    pub reconnect_attempts: u32,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl ClientConfig {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// What a line typed by the user means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Frame to send
    Send(Message),
    /// Local hint, nothing is sent
    Hint(&'static str),
    /// Leave the chat
    Quit,
    /// Blank line
    Empty,
}

/// Interpret one input line
///
/// Until the server confirmed a username every line is a registration
/// attempt, mirroring how the server reads the first frames.
pub fn parse_input(line: &str, registered: bool) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if line == "/quit" || line == "/exit" {
        return Input::Quit;
    }
    if !registered {
        return Input::Send(Message::new(MessageType::Connect).with_content(line));
    }
    if line == USERS_QUERY {
        return Input::Send(Message::status(USERS_QUERY));
    }
    let msg_args = line
        .strip_prefix("/msg")
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
    if let Some(rest) = msg_args {
        let parsed = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .map(|(to, text)| (to, text.trim()))
            .filter(|(_, text)| !text.is_empty());
        return match parsed {
            Some((to, text)) => Input::Send(
                Message::new(MessageType::Private)
                    .with_recipient(to)
                    .with_content(text),
            ),
            None => Input::Hint(MSG_USAGE),
        };
    }
    Input::Send(Message::new(MessageType::Chat).with_content(line))
}

/// Format a received message for the terminal
pub fn render(message: &Message) -> String {
    let time = DateTime::from_timestamp_millis(message.timestamp())
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let content = message.content().unwrap_or_default();
    let sender = message.sender().unwrap_or("?");

    match message.kind() {
        MessageType::Chat | MessageType::Broadcast => {
            format!("[{}] {}: {}", time, sender, content)
        }
        MessageType::Private => format!("[{}] (private) {}: {}", time, sender, content),
        MessageType::Status => format!("[{}] * {}", time, content),
        MessageType::Error => format!("[{}] ! {}", time, content),
        MessageType::Connect | MessageType::Disconnect => {
            format!("[{}] {:?} {}", time, message.kind(), content)
        }
    }
}

/// How a connection ended
enum Outcome {
    Quit,
    ConnectionLost,
}

/// Run the client until the user quits or reconnecting gives up
pub async fn run(config: ClientConfig) -> Result<(), AppError> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut username = config.username.clone();
    let mut attempts = 0;

    println!("type a username to join, then chat. /users, /msg <user> <text>, /quit");

    loop {
        match TcpStream::connect(config.server_addr()).await {
            Ok(stream) => {
                println!("connected to {}", config.server_addr());
                attempts = 0;
                match chat(stream, &mut stdin, &mut username).await? {
                    Outcome::Quit => return Ok(()),
                    Outcome::ConnectionLost => println!("connection lost"),
                }
            }
            Err(e) => warn!("Connecting to {} failed: {}", config.server_addr(), e),
        }

        attempts += 1;
        if attempts > config.reconnect_attempts {
            return Err(AppError::ReconnectExhausted(config.reconnect_attempts));
        }
        let delay = Duration::from_secs(u64::from(attempts));
        println!(
            "reconnecting in {}s (attempt {}/{})",
            delay.as_secs(),
            attempts,
            config.reconnect_attempts
        );
        tokio::time::sleep(delay).await;
    }
}

/// One connection's worth of chatting
async fn chat(
    stream: TcpStream,
    stdin: &mut Lines<BufReader<Stdin>>,
    username: &mut Option<String>,
) -> Result<Outcome, AppError> {
    let mut framed = Framed::new(stream, LineCodec::new());
    let mut registered = false;
    // Last username asked for and not yet confirmed
    let mut pending: Option<String> = None;

    if let Some(name) = username.as_deref() {
        let claim = Message::new(MessageType::Connect).with_content(name);
        if framed.send(claim).await.is_err() {
            return Ok(Outcome::ConnectionLost);
        }
        pending = Some(name.to_string());
    }

    loop {
        tokio::select! {
            frame = framed.next() => match frame {
                Some(Ok(Ok(message))) => {
                    if !registered
                        && pending.as_deref().is_some_and(|c| confirms_claim(&message, c))
                    {
                        registered = true;
                        *username = pending.take();
                    }
                    println!("{}", render(&message));
                }
                Some(Ok(Err(e))) => warn!("Unreadable frame from server: {}", e),
                Some(Err(e)) => {
                    debug!("Connection error: {}", e);
                    return Ok(Outcome::ConnectionLost);
                }
                None => return Ok(Outcome::ConnectionLost),
            },
            line = stdin.next_line() => {
                let Some(line) = line? else {
                    let _ = framed.close().await;
                    return Ok(Outcome::Quit);
                };
                match parse_input(&line, registered) {
                    Input::Send(message) => {
                        if message.kind() == MessageType::Connect {
                            pending = message.content().map(str::to_string);
                        }
                        if framed.send(message).await.is_err() {
                            return Ok(Outcome::ConnectionLost);
                        }
                    }
                    Input::Hint(hint) => println!("{}", hint),
                    Input::Quit => {
                        let _ = framed.close().await;
                        return Ok(Outcome::Quit);
                    }
                    Input::Empty => {}
                }
            }
        }
    }
}

/// Whether `message` is the server confirming our claim on `claim`
fn confirms_claim(message: &Message, claim: &str) -> bool {
    message.kind() == MessageType::Status
        && message
            .content()
            .and_then(|c| c.strip_prefix(USERNAME_SET_PREFIX))
            == Some(claim)
}
