//! line_chat server - Entry Point
//!
//! Parses the configuration, binds the TCP listener and serves until SIGINT
//! or SIGTERM.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use line_chat::config::{init_logging, ServerConfig};
use line_chat::listener::{bind, serve, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();

    // Use RUST_LOG env var to override, e.g. RUST_LOG=line_chat=debug
    init_logging(&config.log_level);

    let addr = config.bind_addr();
    let listener = match bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("Chat server listening on {}", addr);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        signal_token.cancel();
    });

    serve(listener, shutdown).await;

    Ok(())
}
