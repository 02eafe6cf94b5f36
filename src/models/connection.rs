//! Connection and session data models.
//!
//! This module defines the connection settings carried by every request and
//! the read-only session snapshot exposed by the registry.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default MySQL port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

/// Settings for opening one MySQL connection.
///
/// Contains credentials, so it is never logged in full: the `Debug`
/// implementation masks the password and [`ConnectionConfig::display_target`]
/// is what log statements use.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Database to select after connecting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl ConnectionConfig {
    /// Create a new connection configuration with the default port.
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MYSQL_PORT,
            user: user.into(),
            password: password.into(),
            database: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// `host:port/database` without credentials, for logs.
    pub fn display_target(&self) -> String {
        match &self.database {
            Some(db) => format!("{}:{}/{}", self.host, self.port, db),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

/// One executed statement in a session's history.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    pub query: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of a session's metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    /// Database selected when the session was opened
    pub current_db: Option<String>,
    pub query_history: Vec<QueryRecord>,
}
