//! Terminal client for the line_chat server
//!
//! ```not_rust
//! cargo run --bin line_chat_client -- --username alice
//! ```

use clap::Parser;

use line_chat::client::{self, ClientConfig};
use line_chat::config::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::parse();
    init_logging(&config.log_level);

    client::run(config).await?;

    Ok(())
}
