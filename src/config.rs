//! Command line configuration and logging setup

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port
pub const DEFAULT_PORT: u16 = 3000;

/// Server options
#[derive(Parser, Debug, Clone)]
#[command(name = "line_chat")]
#[command(about = "TCP chat server speaking newline-delimited JSON", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "LINE_CHAT_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "LINE_CHAT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Initialize logging with an environment filter
///
/// `RUST_LOG` wins when set (e.g. `RUST_LOG=line_chat=trace`); otherwise the
/// crate logs at `default_level`.
pub fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("line_chat={}", default_level))),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["line_chat"]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_flags_override_defaults() {
        let config =
            ServerConfig::try_parse_from(["line_chat", "-H", "0.0.0.0", "--port", "4000"]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(ServerConfig::try_parse_from(["line_chat", "--port", "not-a-port"]).is_err());
    }
}
