//! Query execution tool.
//!
//! This module implements the `execute_query` tool. Any statement is
//! accepted; the executor decides from the result descriptor whether rows,
//! an affected-row count or a status string come back.

use crate::db::{Connector, QueryExecutor, SessionRegistry};
use crate::error::codes;
use crate::models::{ConnectionConfig, ExecuteQueryParams, Response};
use crate::tools::dispatcher::{failure, rejected, success};
use crate::tools::scope::ScopedHandle;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Handler for the execute_query tool.
pub struct QueryToolHandler<C: Connector> {
    registry: Arc<SessionRegistry<C>>,
}

impl<C: Connector> QueryToolHandler<C> {
    pub fn new(registry: Arc<SessionRegistry<C>>) -> Self {
        Self { registry }
    }

    /// Run one statement.
    ///
    /// History is recorded only for caller-supplied sessions. An ad hoc
    /// connection is closed afterwards, on success and on failure.
    pub async fn execute_query(
        &self,
        config: &ConnectionConfig,
        session_id: Option<&str>,
        params: ExecuteQueryParams,
    ) -> Response {
        let start = Instant::now();

        let Some(query) = params.query.filter(|q| !q.trim().is_empty()) else {
            return rejected(
                codes::INVALID_PARAMETERS,
                "Missing required parameter: query",
                "The execute_query action requires a query parameter",
            );
        };

        let mut scope = match ScopedHandle::acquire(&self.registry, config, session_id).await {
            Ok(scope) => scope,
            Err(e) => return failure(&e, start),
        };

        let bound = params.params.unwrap_or_default();
        let outcome = QueryExecutor::execute(&mut *scope.guard, &query, &bound).await;

        if let Some(id) = session_id {
            self.registry.record_query(id, &query).await;
        }
        let session = scope.session_id.clone();
        scope.release(&self.registry).await;

        match outcome.result {
            Ok(data) => {
                let row_count = data.row_count();
                info!(
                    session_id = %session,
                    row_count = row_count,
                    execution_time_ms = outcome.execution_time.as_millis() as u64,
                    "Query executed"
                );
                let response = success(&data, start).with_row_count(row_count);
                if params.include_performance_metrics {
                    response.with_query_execution_time(outcome.execution_time)
                } else {
                    response
                }
            }
            Err(e) => failure(&e, start),
        }
    }
}
