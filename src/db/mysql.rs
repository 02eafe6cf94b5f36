//! MySQL implementation of the connection capability interface.
//!
//! Each session owns one dedicated `MySqlConnection` (no pool). Whether a
//! statement returns rows is decided from the prepared statement's column
//! metadata, so no SQL parsing is involved. Statements the server refuses to
//! prepare are run over the text protocol when they carry no parameters.

use crate::db::handle::{ConnectionHandle, Connector, StatementOutput};
use crate::db::params::bind_mysql_param;
use crate::db::types::row_to_json;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, QueryParam};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Column, Connection, Executor, Statement};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for opening a connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Build connect options from request settings.
pub fn build_connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
    let mut opts = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .charset("utf8mb4");

    if let Some(db) = config.database.as_deref() {
        opts = opts.database(db);
    }
    opts
}

/// Quote an identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

async fn open_connection(
    options: &MySqlConnectOptions,
    connect_timeout: Duration,
) -> DbResult<MySqlConnection> {
    match tokio::time::timeout(connect_timeout, MySqlConnection::connect_with(options)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(DbError::timeout("connect", connect_timeout.as_secs())),
    }
}

/// Opens dedicated MySQL connections.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }
}

impl Connector for MySqlConnector {
    type Handle = MySqlHandle;

    async fn connect(&self, config: &ConnectionConfig) -> DbResult<MySqlHandle> {
        info!(server = %config.display_target(), "Connecting to MySQL");
        let options = build_connect_options(config);
        let conn = open_connection(&options, self.connect_timeout).await?;
        Ok(MySqlHandle {
            conn: Some(conn),
            options,
            connect_timeout: self.connect_timeout,
            in_transaction: false,
        })
    }
}

/// A session's MySQL connection plus the settings needed to reopen it.
pub struct MySqlHandle {
    conn: Option<MySqlConnection>,
    options: MySqlConnectOptions,
    connect_timeout: Duration,
    /// Set by `begin` (or a START TRANSACTION statement), cleared by commit/rollback
    in_transaction: bool,
}

impl MySqlHandle {
    fn connection(&mut self) -> DbResult<&mut MySqlConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| DbError::internal("ConnectionClosed", "Connection is closed"))
    }

    async fn run_control(&mut self, sql: &'static str) -> DbResult<()> {
        let conn = self.connection()?;
        conn.execute(sql).await?;
        Ok(())
    }

    /// Keep the transaction flag in step with control statements sent as plain SQL.
    fn observe_transaction_control(&mut self, sql: &str) {
        match TransactionControl::detect(sql) {
            Some(TransactionControl::Start) => self.in_transaction = true,
            Some(TransactionControl::End) => self.in_transaction = false,
            None => {}
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TransactionControl {
    Start,
    End,
}

impl TransactionControl {
    fn detect(sql: &str) -> Option<Self> {
        let upper = sql.trim().trim_end_matches(';').trim_end().to_uppercase();
        let mut words = upper.split_whitespace();
        match (words.next(), words.next()) {
            (Some("START"), Some("TRANSACTION")) => Some(Self::Start),
            (Some("BEGIN"), None) | (Some("BEGIN"), Some("WORK")) => Some(Self::Start),
            (Some("COMMIT"), _) => Some(Self::End),
            // ROLLBACK TO SAVEPOINT keeps the transaction open
            (Some("ROLLBACK"), Some("TO")) => None,
            (Some("ROLLBACK"), _) => Some(Self::End),
            _ => None,
        }
    }
}

impl ConnectionHandle for MySqlHandle {
    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<StatementOutput> {
        let conn = self.connection()?;

        let columns = match (&mut *conn).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect::<Vec<_>>(),
            Err(e) if params.is_empty() => {
                debug!(error = %e, "Statement not preparable, using text protocol");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let output = if !columns.is_empty() {
            let rows = if params.is_empty() {
                // Raw SQL for parameterless statements, matching what a client would send
                (&mut *conn).fetch_all(sql).await?
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                query.fetch_all(&mut *conn).await?
            };
            StatementOutput::Rows {
                columns,
                rows: rows.iter().map(row_to_json).collect(),
            }
        } else {
            let result = if params.is_empty() {
                (&mut *conn).execute(sql).await?
            } else {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                query.execute(&mut *conn).await?
            };
            StatementOutput::NoResultSet {
                rows_affected: result.rows_affected(),
            }
        };

        self.observe_transaction_control(sql);
        Ok(output)
    }

    async fn begin(&mut self) -> DbResult<()> {
        self.run_control("START TRANSACTION").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.run_control("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.run_control("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn is_alive(&mut self) -> bool {
        match self.conn.as_mut() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        }
    }

    async fn reconnect(&mut self) -> DbResult<()> {
        warn!(host = %self.options.get_host(), "Connection lost, reconnecting");
        let conn = open_connection(&self.options, self.connect_timeout).await?;
        // The old connection is already broken; dropping it is enough
        self.conn = Some(conn);
        self.in_transaction = false;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Error while closing connection");
            }
        }
        self.in_transaction = false;
    }

    fn in_transaction(&self) -> Option<bool> {
        Some(self.in_transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_backticks() {
        assert_eq!(quote_ident("users"), "`users`");
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_build_connect_options() {
        let config = ConnectionConfig::new("db.local", "app", "pw")
            .with_port(3307)
            .with_database("shop");
        let opts = build_connect_options(&config);
        assert_eq!(opts.get_host(), "db.local");
        assert_eq!(opts.get_port(), 3307);
        assert_eq!(opts.get_username(), "app");
        assert_eq!(opts.get_database(), Some("shop"));
    }

    #[test]
    fn test_detect_transaction_control() {
        assert_eq!(
            TransactionControl::detect("start transaction"),
            Some(TransactionControl::Start)
        );
        assert_eq!(
            TransactionControl::detect("  BEGIN;"),
            Some(TransactionControl::Start)
        );
        assert_eq!(
            TransactionControl::detect("COMMIT"),
            Some(TransactionControl::End)
        );
        assert_eq!(
            TransactionControl::detect("rollback"),
            Some(TransactionControl::End)
        );
        assert_eq!(TransactionControl::detect("ROLLBACK TO SAVEPOINT sp1"), None);
        assert_eq!(TransactionControl::detect("SELECT 1"), None);
        // BEGIN ... END blocks only appear in stored programs
        assert_eq!(TransactionControl::detect("BEGIN NOT ATOMIC"), None);
    }
}
