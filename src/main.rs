//! MySQL MCP Server - Main entry point.
//!
//! Serves session-scoped MySQL access over stdio (MCP) or HTTP (request
//! envelope endpoint plus streamable MCP).

use clap::Parser;
use mysql_mcp_server::config::{Config, TransportMode};
use mysql_mcp_server::db::{MySqlConnector, SessionRegistry};
use mysql_mcp_server::tools::ActionDispatcher;
use mysql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    if let Err(message) = config.validate() {
        eprintln!("Error: {}", message);
        std::process::exit(2);
    }

    init_tracing(&config);

    info!(
        transport = %config.transport,
        session_timeout_secs = config.session_timeout,
        connect_timeout_secs = config.connect_timeout,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // One registry for the whole process, shared by every handler
    let connector = MySqlConnector::new(config.connect_timeout_duration());
    let registry = Arc::new(SessionRegistry::with_timeout(
        connector,
        config.session_timeout_duration(),
    ));
    let dispatcher = ActionDispatcher::new(registry);

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(dispatcher).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                api_endpoint = %config.api_endpoint,
                mcp_endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                dispatcher,
                &config.http_host,
                config.http_port,
                &config.api_endpoint,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
