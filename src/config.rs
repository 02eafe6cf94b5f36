//! Configuration handling for the MySQL MCP Server.
//!
//! This module provides configuration management via CLI arguments and
//! environment variables. Database credentials are not configured here; they
//! arrive with every request.

use crate::db::mysql::DEFAULT_CONNECT_TIMEOUT_SECS;
use crate::db::session::DEFAULT_SESSION_TIMEOUT_SECS;
use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_API_ENDPOINT: &str = "/api/mcp";
pub const DEFAULT_MCP_ENDPOINT: &str = "/mcp";

/// Transport mode for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// MCP over standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Request envelope endpoint plus streamable MCP over HTTP
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the MySQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mysql-mcp-server",
    about = "MySQL server with session-scoped connections, transactions and schema discovery",
    version,
    author
)]
pub struct Config {
    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "MCP_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "MCP_HTTP_PORT")]
    pub http_port: u16,

    /// Path of the request envelope endpoint (only used with http transport)
    #[arg(long, default_value = DEFAULT_API_ENDPOINT, env = "MCP_API_ENDPOINT")]
    pub api_endpoint: String,

    /// Path of the streamable MCP endpoint (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Close sessions unused for longer than this many seconds
    #[arg(
        long,
        default_value_t = DEFAULT_SESSION_TIMEOUT_SECS,
        env = "MCP_SESSION_TIMEOUT"
    )]
    pub session_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            session_timeout: DEFAULT_SESSION_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Check values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_timeout == 0 {
            return Err("session_timeout must be greater than 0".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("connect_timeout must be greater than 0".to_string());
        }
        for (name, path) in [
            ("api_endpoint", &self.api_endpoint),
            ("mcp_endpoint", &self.mcp_endpoint),
        ] {
            if !path.starts_with('/') {
                return Err(format!("{} must start with '/': {}", name, path));
            }
        }
        if self.api_endpoint == self.mcp_endpoint {
            return Err(format!(
                "api_endpoint and mcp_endpoint must differ (both are {})",
                self.api_endpoint
            ));
        }
        Ok(())
    }

    pub fn session_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.session_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.session_timeout, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::try_parse_from([
            "mysql-mcp-server",
            "--transport",
            "http",
            "--http-port",
            "9000",
            "--session-timeout",
            "60",
            "--api-endpoint",
            "/api",
        ])
        .unwrap();
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.session_timeout_duration(), Duration::from_secs(60));
        assert_eq!(config.api_endpoint, "/api");
        assert_eq!(config.mcp_endpoint, DEFAULT_MCP_ENDPOINT);
    }

    #[test]
    fn test_rejects_unknown_transport() {
        assert!(Config::try_parse_from(["mysql-mcp-server", "--transport", "sse"]).is_err());
    }

    #[test]
    fn test_validate_timeouts() {
        let config = Config {
            session_timeout: 0,
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().contains("session_timeout"));

        let config = Config {
            connect_timeout: 0,
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().contains("connect_timeout"));
    }

    #[test]
    fn test_validate_endpoints() {
        let config = Config {
            api_endpoint: "api".to_string(),
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().contains("must start with '/'"));

        let config = Config {
            api_endpoint: "/mcp".to_string(),
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().contains("must differ"));
    }

    #[test]
    fn test_transport_display() {
        assert_eq!(TransportMode::Stdio.to_string(), "stdio");
        assert_eq!(TransportMode::Http.to_string(), "http");
    }
}
