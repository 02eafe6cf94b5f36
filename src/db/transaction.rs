//! Transaction coordination on a session's handle.
//!
//! Holds no state of its own: begin/commit/rollback drive the connection's
//! primitives and `status` reads the state back from the server.

use crate::db::handle::ConnectionHandle;
use crate::error::{DbError, DbResult};
use crate::models::{
    IsolationLevel, Row, TransactionOperation, TransactionResult, TransactionStatus,
};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

pub struct TransactionCoordinator;

impl TransactionCoordinator {
    /// Dispatch an operation by name (`begin`, `commit`, `rollback`).
    pub async fn manage<H: ConnectionHandle>(
        handle: &mut H,
        operation: &str,
        isolation_level: Option<&str>,
    ) -> DbResult<TransactionResult> {
        let operation = TransactionOperation::parse(operation).ok_or_else(|| {
            DbError::invalid_input(format!(
                "Invalid operation. Must be one of: {}",
                TransactionOperation::VALID_VALUES
            ))
        })?;

        match operation {
            TransactionOperation::Begin => Self::begin(handle, isolation_level).await,
            TransactionOperation::Commit => Self::commit(handle).await,
            TransactionOperation::Rollback => Self::rollback(handle).await,
        }
    }

    /// Start a transaction, applying the isolation level first if given.
    ///
    /// An unknown level is rejected before anything is sent to the server.
    pub async fn begin<H: ConnectionHandle>(
        handle: &mut H,
        isolation_level: Option<&str>,
    ) -> DbResult<TransactionResult> {
        let level = isolation_level
            .map(|name| {
                IsolationLevel::parse(name).ok_or_else(|| {
                    DbError::invalid_input(format!(
                        "Invalid isolation level. Must be one of: {}",
                        IsolationLevel::VALID_VALUES
                    ))
                })
            })
            .transpose()?;

        let mut result = TransactionResult::new(TransactionOperation::Begin);
        if let Some(level) = level {
            // Applies to the next transaction only
            let sql = format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql());
            handle.execute(&sql, &[]).await?;
            result = result.with_isolation_level(level);
        }

        handle.begin().await?;
        info!(isolation_level = ?level, "Transaction started");
        Ok(result)
    }

    pub async fn commit<H: ConnectionHandle>(handle: &mut H) -> DbResult<TransactionResult> {
        handle.commit().await?;
        info!("Transaction committed");
        Ok(TransactionResult::new(TransactionOperation::Commit))
    }

    pub async fn rollback<H: ConnectionHandle>(handle: &mut H) -> DbResult<TransactionResult> {
        handle.rollback().await?;
        info!("Transaction rolled back");
        Ok(TransactionResult::new(TransactionOperation::Rollback))
    }

    /// Read autocommit, isolation level and the in-transaction flag.
    ///
    /// The flag comes from the handle when it reports one natively. Otherwise,
    /// with autocommit off, a temporary table is created and dropped as a
    /// probe: success means "in transaction", and a failed probe falls back
    /// to "autocommit is off" as the signal.
    pub async fn status<H: ConnectionHandle>(handle: &mut H) -> DbResult<TransactionStatus> {
        let autocommit = read_variable(handle, "SELECT @@autocommit AS value")
            .await?
            .map(|v| json_truthy(&v))
            .unwrap_or(true);
        let isolation_level = read_isolation_level(handle).await?;

        let in_transaction = match handle.in_transaction() {
            Some(flag) => flag,
            None if !autocommit => probe_in_transaction(handle).await,
            None => false,
        };

        Ok(TransactionStatus {
            in_transaction,
            autocommit,
            isolation_level,
        })
    }
}

async fn read_variable<H: ConnectionHandle>(handle: &mut H, sql: &str) -> DbResult<Option<JsonValue>> {
    let rows = handle.execute(sql, &[]).await?.into_rows();
    Ok(rows.into_iter().next().and_then(first_value))
}

/// `@@transaction_isolation` on MySQL 8, `@@tx_isolation` on older servers.
/// Reported as the server spells it, e.g. `REPEATABLE-READ`.
async fn read_isolation_level<H: ConnectionHandle>(handle: &mut H) -> DbResult<Option<String>> {
    let value = match read_variable(handle, "SELECT @@transaction_isolation AS value").await {
        Ok(value) => value,
        Err(DbError::Database { .. }) => {
            read_variable(handle, "SELECT @@tx_isolation AS value").await?
        }
        Err(e) => return Err(e),
    };
    Ok(value.and_then(|v| v.as_str().map(str::to_string)))
}

async fn probe_in_transaction<H: ConnectionHandle>(handle: &mut H) -> bool {
    let table = format!("mcp_tx_check_{}", uuid::Uuid::new_v4().simple());
    let create = format!("CREATE TEMPORARY TABLE {} (id INT)", table);
    let drop = format!("DROP TEMPORARY TABLE {}", table);

    let probe = match handle.execute(&create, &[]).await {
        Ok(_) => handle.execute(&drop, &[]).await.map(|_| ()),
        Err(e) => Err(e),
    };

    if let Err(e) = probe {
        // Autocommit is off either way, which usually means a transaction is open
        debug!(error = %e, "Transaction probe failed");
    }
    true
}

fn first_value(row: Row) -> Option<JsonValue> {
    row.into_iter().next().map(|(_, v)| v).filter(|v| !v.is_null())
}

fn json_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(true),
        JsonValue::String(s) => !matches!(s.as_str(), "0" | "" | "OFF" | "off"),
        _ => false,
    }
}
