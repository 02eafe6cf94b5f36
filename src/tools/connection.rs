//! Connection check tool.
//!
//! `test_connection` opens (or reuses) a session, asks the server who it is
//! and leaves the session open for later calls.

use crate::db::schema::get_str;
use crate::db::{ConnectionHandle, Connector, SessionRegistry};
use crate::error::DbResult;
use crate::models::{ConnectionConfig, Response};
use crate::tools::dispatcher::{failure, success};
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const SERVER_INFO_QUERY: &str = "SELECT @@version AS version, @@version_comment AS version_comment, DATABASE() AS current_database";

/// Output from the test_connection tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConnectionTestOutput {
    pub connected: bool,
    /// e.g. "8.0.36"
    pub server_version: Option<String>,
    /// e.g. "MySQL Community Server - GPL"
    pub server_info: Option<String>,
    pub current_database: Option<String>,
    /// Pass this back as `session_id` to keep using the connection
    pub session_id: String,
}

/// Handler for the test_connection tool.
pub struct ConnectionToolHandler<C: Connector> {
    registry: Arc<SessionRegistry<C>>,
}

impl<C: Connector> ConnectionToolHandler<C> {
    pub fn new(registry: Arc<SessionRegistry<C>>) -> Self {
        Self { registry }
    }

    /// Verify connectivity.
    ///
    /// A supplied session is reused when it can still be fetched; otherwise
    /// a new session is opened under a fresh id. If the server query fails
    /// the session is closed.
    pub async fn test_connection(
        &self,
        config: &ConnectionConfig,
        session_id: Option<&str>,
    ) -> Response {
        let start = Instant::now();

        let acquired = match session_id {
            Some(id) => match self.registry.get(id).await {
                Ok(guard) => Ok((id.to_string(), guard)),
                Err(e) => {
                    debug!(session_id = %id, error = %e, "Session unusable, opening a new one");
                    self.registry.connect(config, None).await
                }
            },
            None => self.registry.connect(config, None).await,
        };

        let (session_id, mut guard) = match acquired {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(host = %config.host, port = config.port, error = %e, "Connection test failed");
                return failure(&e, start);
            }
        };

        let probe = server_info(&mut *guard).await;
        drop(guard);

        match probe {
            Ok((server_version, server_info, current_database)) => {
                info!(
                    session_id = %session_id,
                    server_version = ?server_version,
                    "Connection verified"
                );
                success(
                    &ConnectionTestOutput {
                        connected: true,
                        server_version,
                        server_info,
                        current_database,
                        session_id,
                    },
                    start,
                )
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Server info query failed");
                self.registry.close(&session_id).await;
                failure(&e, start)
            }
        }
    }
}

async fn server_info<H: ConnectionHandle>(
    handle: &mut H,
) -> DbResult<(Option<String>, Option<String>, Option<String>)> {
    let rows = handle.execute(SERVER_INFO_QUERY, &[]).await?.into_rows();
    Ok(rows
        .first()
        .map(|row| {
            (
                get_str(row, "version"),
                get_str(row, "version_comment"),
                get_str(row, "current_database"),
            )
        })
        .unwrap_or_default())
}
