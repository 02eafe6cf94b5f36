//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations. Logs go to
//! stderr so they never interleave with protocol messages.

use crate::db::MySqlConnector;
use crate::error::{DbError, DbResult};
use crate::mcp::MySqlService;
use crate::tools::ActionDispatcher;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

/// Stdio transport implementation.
pub struct StdioTransport {
    dispatcher: ActionDispatcher<MySqlConnector>,
}

impl StdioTransport {
    pub fn new(dispatcher: ActionDispatcher<MySqlConnector>) -> Self {
        Self { dispatcher }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = MySqlService::new(self.dispatcher.clone());
        let running_service = service.serve(stdio()).await.map_err(|e| {
            DbError::internal(
                "TransportError",
                format!("Failed to start stdio transport: {}", e),
            )
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                if let Err(e) = result {
                    warn!(error = %e, "Stdio transport error");
                    self.dispatcher.registry().close_all().await;
                    return Err(DbError::internal(
                        "TransportError",
                        format!("Stdio transport error: {}", e),
                    ));
                }
                info!("Stdio transport completed normally");
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing all sessions");
        self.dispatcher.registry().close_all().await;

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted by select!
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SessionRegistry;
    use std::sync::Arc;

    #[test]
    fn test_stdio_transport_creation() {
        let registry = Arc::new(SessionRegistry::new(MySqlConnector::default()));
        let transport = StdioTransport::new(ActionDispatcher::new(registry));
        assert_eq!(transport.name(), "stdio");
    }
}
