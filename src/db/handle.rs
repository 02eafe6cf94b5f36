//! Connection capability interface.
//!
//! Everything above the registry talks to a database connection through
//! [`ConnectionHandle`], and sessions are opened through a [`Connector`].
//! The MySQL implementation lives in [`crate::db::mysql`]; tests plug in
//! scripted fakes.

use crate::error::DbResult;
use crate::models::{ConnectionConfig, QueryParam, Row};
use std::future::Future;

/// What a statement produced, decided by the presence of a result-set descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    /// The statement described a result set; `columns` is its column order.
    Rows { columns: Vec<String>, rows: Vec<Row> },
    /// No result set.
    NoResultSet { rows_affected: u64 },
}

impl StatementOutput {
    /// Rows of a result set, or an empty list for statements without one.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows { rows, .. } => rows,
            Self::NoResultSet { .. } => Vec::new(),
        }
    }
}

/// One live, stateful database connection.
///
/// Not safe for unsynchronized use by two callers; the registry hands out
/// exclusive guards.
pub trait ConnectionHandle: Send + 'static {
    /// Run one statement, binding `params` positionally when non-empty.
    ///
    /// Result-set resources are released before the future resolves, on
    /// success and on error.
    fn execute(
        &mut self,
        sql: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = DbResult<StatementOutput>> + Send;

    /// Start an explicit transaction.
    fn begin(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Cheap liveness check (a ping).
    fn is_alive(&mut self) -> impl Future<Output = bool> + Send;

    /// Replace the underlying connection with a fresh one using the same settings.
    fn reconnect(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Close the connection. Errors are swallowed; closing twice is harmless.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Native in-transaction flag.
    ///
    /// Optional capability: backends that cannot report it return `None`
    /// (the default), and callers fall back to probing the server.
    fn in_transaction(&self) -> Option<bool> {
        None
    }
}

/// Opens connection handles.
pub trait Connector: Send + Sync + 'static {
    type Handle: ConnectionHandle;

    fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = DbResult<Self::Handle>> + Send;
}

/// Scripted in-memory handle for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::DbError;

    type Responder = Box<dyn FnMut(&str, &[QueryParam]) -> DbResult<StatementOutput> + Send>;

    pub(crate) struct ScriptedHandle {
        responder: Responder,
        pub statements: Vec<String>,
        pub begins: usize,
        pub commits: usize,
        pub rollbacks: usize,
        pub native_flag: bool,
        pub tracked_in_transaction: bool,
        pub alive: bool,
        pub closed: bool,
    }

    impl ScriptedHandle {
        pub fn new(
            responder: impl FnMut(&str, &[QueryParam]) -> DbResult<StatementOutput> + Send + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                statements: Vec::new(),
                begins: 0,
                commits: 0,
                rollbacks: 0,
                native_flag: false,
                tracked_in_transaction: false,
                alive: true,
                closed: false,
            }
        }

        /// Report the transaction flag natively instead of leaving it to the probe.
        pub fn with_native_flag(mut self) -> Self {
            self.native_flag = true;
            self
        }
    }

    /// Build a one-row-per-entry result set from `(column, value)` pairs.
    pub(crate) fn rows(columns: &[&str], values: Vec<Vec<serde_json::Value>>) -> StatementOutput {
        let rows = values
            .into_iter()
            .map(|vals| {
                columns
                    .iter()
                    .map(|c| c.to_string())
                    .zip(vals)
                    .collect::<Row>()
            })
            .collect();
        StatementOutput::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    impl ConnectionHandle for ScriptedHandle {
        async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<StatementOutput> {
            if self.closed {
                return Err(DbError::internal("ConnectionClosed", "connection is closed"));
            }
            self.statements.push(sql.to_string());
            (self.responder)(sql, params)
        }

        async fn begin(&mut self) -> DbResult<()> {
            self.begins += 1;
            self.tracked_in_transaction = true;
            Ok(())
        }

        async fn commit(&mut self) -> DbResult<()> {
            self.commits += 1;
            self.tracked_in_transaction = false;
            Ok(())
        }

        async fn rollback(&mut self) -> DbResult<()> {
            self.rollbacks += 1;
            self.tracked_in_transaction = false;
            Ok(())
        }

        async fn is_alive(&mut self) -> bool {
            self.alive && !self.closed
        }

        async fn reconnect(&mut self) -> DbResult<()> {
            self.alive = true;
            Ok(())
        }

        async fn close(&mut self) {
            self.closed = true;
        }

        fn in_transaction(&self) -> Option<bool> {
            self.native_flag.then_some(self.tracked_in_transaction)
        }
    }
}
