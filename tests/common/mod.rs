//! In-memory stand-ins for a MySQL server, shared by the integration tests.

#![allow(dead_code)]

use mysql_mcp_server::db::{ConnectionHandle, Connector, SessionRegistry, StatementOutput};
use mysql_mcp_server::error::{CR_CONN_HOST_ERROR, DbError, DbResult};
use mysql_mcp_server::models::{ConnectionConfig, QueryParam, Row};
use mysql_mcp_server::tools::ActionDispatcher;
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Host name the fake connector refuses, like an unreachable server.
pub const UNREACHABLE_HOST: &str = "unreachable.invalid";

pub type Responder = dyn Fn(&str, &[QueryParam], Option<&str>) -> DbResult<StatementOutput> + Send + Sync;

/// Shared state of the fake server, visible to the test after the handles are gone.
#[derive(Default)]
pub struct FakeServer {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub reconnects: AtomicUsize,
    /// Makes every live handle fail its next liveness check
    pub drop_connections: AtomicBool,
    /// Every statement and transaction primitive, in order
    pub log: Mutex<Vec<String>>,
}

impl FakeServer {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn record(&self, entry: impl Into<String>) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry.into());
        }
    }
}

pub struct FakeConnector {
    pub server: Arc<FakeServer>,
    responder: Arc<Responder>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::with_responder(default_responder)
    }

    pub fn with_responder(
        responder: impl Fn(&str, &[QueryParam], Option<&str>) -> DbResult<StatementOutput>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            server: Arc::new(FakeServer::default()),
            responder: Arc::new(responder),
        }
    }
}

impl Connector for FakeConnector {
    type Handle = FakeHandle;

    async fn connect(&self, config: &ConnectionConfig) -> DbResult<FakeHandle> {
        if config.host == UNREACHABLE_HOST {
            return Err(DbError::connection(
                CR_CONN_HOST_ERROR,
                format!("Can't connect to MySQL server on '{}'", config.host),
            ));
        }
        self.server.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeHandle {
            server: Arc::clone(&self.server),
            responder: Arc::clone(&self.responder),
            database: config.database.clone(),
            in_transaction: false,
            closed: false,
        })
    }
}

pub struct FakeHandle {
    server: Arc<FakeServer>,
    responder: Arc<Responder>,
    database: Option<String>,
    in_transaction: bool,
    closed: bool,
}

impl std::fmt::Debug for FakeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeHandle")
            .field("database", &self.database)
            .field("in_transaction", &self.in_transaction)
            .field("closed", &self.closed)
            .finish()
    }
}

impl ConnectionHandle for FakeHandle {
    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<StatementOutput> {
        self.server.record(sql);
        (self.responder)(sql, params, self.database.as_deref())
    }

    async fn begin(&mut self) -> DbResult<()> {
        self.server.record("BEGIN");
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.server.record("COMMIT");
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.server.record("ROLLBACK");
        self.in_transaction = false;
        Ok(())
    }

    async fn is_alive(&mut self) -> bool {
        !self.closed && !self.server.drop_connections.load(Ordering::SeqCst)
    }

    async fn reconnect(&mut self) -> DbResult<()> {
        self.server.reconnects.fetch_add(1, Ordering::SeqCst);
        self.server.drop_connections.store(false, Ordering::SeqCst);
        self.in_transaction = false;
        self.closed = false;
        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.server.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn in_transaction(&self) -> Option<bool> {
        Some(self.in_transaction)
    }
}

pub fn rows(columns: &[&str], values: Vec<Vec<JsonValue>>) -> StatementOutput {
    let rows = values
        .into_iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| c.to_string())
                .zip(row)
                .collect::<Row>()
        })
        .collect();
    StatementOutput::Rows {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

/// Answers the handful of statements the handlers send on their own.
pub fn default_responder(
    sql: &str,
    _params: &[QueryParam],
    database: Option<&str>,
) -> DbResult<StatementOutput> {
    let upper = sql.trim().to_uppercase();
    if upper.starts_with("SELECT 1") {
        return Ok(rows(&["x"], vec![vec![json!(1)]]));
    }
    if upper.contains("@@VERSION") {
        return Ok(rows(
            &["version", "version_comment", "current_database"],
            vec![vec![json!("8.0.36"), json!("MySQL Community Server - GPL"), json!(database)]],
        ));
    }
    if upper.contains("DATABASE()") {
        return Ok(rows(&["db_name"], vec![vec![json!(database)]]));
    }
    if upper.contains("@@AUTOCOMMIT") {
        return Ok(rows(&["value"], vec![vec![json!(1)]]));
    }
    if upper.contains("@@TRANSACTION_ISOLATION") {
        return Ok(rows(&["value"], vec![vec![json!("REPEATABLE-READ")]]));
    }
    if upper.contains("INFORMATION_SCHEMA") {
        return Ok(rows(&["table_name"], vec![]));
    }
    if upper.starts_with("SELEC ") {
        return Err(DbError::database(
            Some(1064),
            Some("42000".into()),
            "You have an error in your SQL syntax",
        ));
    }
    if upper.starts_with("INSERT") || upper.starts_with("UPDATE") || upper.starts_with("DELETE") {
        return Ok(StatementOutput::NoResultSet { rows_affected: 1 });
    }
    Ok(StatementOutput::NoResultSet { rows_affected: 0 })
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::new("localhost", "app", "secret").with_database("shop")
}

pub fn dispatcher() -> (ActionDispatcher<FakeConnector>, Arc<FakeServer>) {
    dispatcher_with(FakeConnector::new(), Duration::from_secs(3600))
}

pub fn dispatcher_with(
    connector: FakeConnector,
    timeout: Duration,
) -> (ActionDispatcher<FakeConnector>, Arc<FakeServer>) {
    let server = Arc::clone(&connector.server);
    let registry = Arc::new(SessionRegistry::with_timeout(connector, timeout));
    (ActionDispatcher::new(registry), server)
}
