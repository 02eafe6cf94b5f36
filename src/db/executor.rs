//! Query execution engine.
//!
//! Runs one statement against a session's handle and shapes the result:
//! - a result-set descriptor means rows, fetched in full
//! - otherwise INSERT/UPDATE/DELETE report the affected-row count
//! - anything else reports a fixed success status
//!
//! Statements without a result set are committed afterwards, unless the
//! handle reports an explicit transaction opened by `begin`.

use crate::db::handle::{ConnectionHandle, StatementOutput};
use crate::error::DbResult;
use crate::models::{QueryData, QueryOutcome, QueryParam, STATEMENT_SUCCESS_STATUS};
use std::time::Instant;
use tracing::{debug, warn};

/// Statement kind for results without a descriptor.
///
/// Decided by keyword prefix; callers only see [`StatementKind::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// INSERT, UPDATE or DELETE
    Modification,
    /// DDL, SET, and everything else
    Other,
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        let head: String = sql.trim().chars().take(6).collect::<String>().to_uppercase();
        match head.as_str() {
            "INSERT" | "UPDATE" | "DELETE" => Self::Modification,
            _ => Self::Other,
        }
    }
}

/// Query executor that handles statement execution on a session handle.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Execute one statement. The elapsed time is reported even on failure.
    pub async fn execute<H: ConnectionHandle>(
        handle: &mut H,
        sql: &str,
        params: &[QueryParam],
    ) -> QueryOutcome {
        let start = Instant::now();

        debug!(sql = %sql, params = params.len(), "Executing statement");

        let result = Self::run(handle, sql, params).await;
        let execution_time = start.elapsed();

        match &result {
            Ok(data) => debug!(
                row_count = data.row_count(),
                elapsed_ms = execution_time.as_millis() as u64,
                "Statement executed"
            ),
            Err(e) => warn!(
                error = %e,
                mysql_code = ?e.mysql_code(),
                elapsed_ms = execution_time.as_millis() as u64,
                "Statement failed"
            ),
        }

        QueryOutcome {
            result,
            execution_time,
        }
    }

    async fn run<H: ConnectionHandle>(
        handle: &mut H,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryData> {
        match handle.execute(sql, params).await? {
            StatementOutput::Rows { rows, .. } => Ok(QueryData::Rows(rows)),
            StatementOutput::NoResultSet { rows_affected } => {
                let data = match StatementKind::classify(sql) {
                    StatementKind::Modification => QueryData::Affected(rows_affected),
                    StatementKind::Other => QueryData::Status(STATEMENT_SUCCESS_STATUS.to_string()),
                };
                if handle.in_transaction() != Some(true) {
                    handle.commit().await?;
                }
                Ok(data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handle::testing::{ScriptedHandle, rows};
    use crate::error::DbError;
    use serde_json::json;

    #[test]
    fn test_classify() {
        assert_eq!(StatementKind::classify("INSERT INTO t VALUES (1)"), StatementKind::Modification);
        assert_eq!(StatementKind::classify("  update t set a = 1"), StatementKind::Modification);
        assert_eq!(StatementKind::classify("\n\tDelete FROM t"), StatementKind::Modification);
        assert_eq!(StatementKind::classify("CREATE TABLE t (id INT)"), StatementKind::Other);
        assert_eq!(StatementKind::classify("SET @a = 1"), StatementKind::Other);
        assert_eq!(StatementKind::classify(""), StatementKind::Other);
        assert_eq!(StatementKind::classify("REPLACE INTO t VALUES (1)"), StatementKind::Other);
    }

    #[tokio::test]
    async fn test_select_returns_rows_without_commit() {
        let mut handle = ScriptedHandle::new(|_, _| Ok(rows(&["x"], vec![vec![json!(1)]])));
        let outcome = QueryExecutor::execute(&mut handle, "SELECT 1 AS x", &[]).await;

        let data = outcome.result.as_ref().unwrap();
        assert_eq!(serde_json::to_value(data).unwrap(), json!([{"x": 1}]));
        assert_eq!(outcome.row_count(), Some(1));
        assert_eq!(handle.commits, 0);
    }

    #[tokio::test]
    async fn test_empty_result_set_is_still_rows() {
        let mut handle = ScriptedHandle::new(|_, _| Ok(rows(&["id"], vec![])));
        let outcome = QueryExecutor::execute(&mut handle, "SELECT id FROM t WHERE 0", &[]).await;
        assert_eq!(outcome.result.unwrap(), QueryData::Rows(vec![]));
    }

    #[tokio::test]
    async fn test_insert_reports_affected_and_commits() {
        let mut handle =
            ScriptedHandle::new(|_, _| Ok(StatementOutput::NoResultSet { rows_affected: 2 }));
        let outcome = QueryExecutor::execute(
            &mut handle,
            "insert into t values (?), (?)",
            &[QueryParam::Int(1), QueryParam::Int(2)],
        )
        .await;

        assert_eq!(outcome.result.unwrap(), QueryData::Affected(2));
        assert_eq!(handle.commits, 1);
    }

    #[tokio::test]
    async fn test_ddl_reports_status_and_commits() {
        let mut handle =
            ScriptedHandle::new(|_, _| Ok(StatementOutput::NoResultSet { rows_affected: 0 }));
        let outcome = QueryExecutor::execute(&mut handle, "CREATE TABLE t (id INT)", &[]).await;

        assert_eq!(outcome.row_count(), Some(0));
        assert_eq!(
            outcome.result.unwrap(),
            QueryData::Status("Query executed successfully".into())
        );
        assert_eq!(handle.commits, 1);
    }

    #[tokio::test]
    async fn test_no_commit_inside_explicit_transaction() {
        let mut handle =
            ScriptedHandle::new(|_, _| Ok(StatementOutput::NoResultSet { rows_affected: 1 }))
                .with_native_flag();
        handle.tracked_in_transaction = true;

        let outcome = QueryExecutor::execute(&mut handle, "DELETE FROM t", &[]).await;
        assert_eq!(outcome.result.unwrap(), QueryData::Affected(1));
        assert_eq!(handle.commits, 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_elapsed_time() {
        let mut handle = ScriptedHandle::new(|_, _| {
            Err(DbError::database(Some(1064), Some("42000".into()), "syntax error"))
        });
        let outcome = QueryExecutor::execute(&mut handle, "SELEC 1", &[]).await;

        assert!(!outcome.is_success());
        assert!(matches!(outcome.result, Err(DbError::Database { code: Some(1064), .. })));
        assert_eq!(handle.commits, 0);
    }
}
