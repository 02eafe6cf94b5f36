//! Transaction management tools.
//!
//! This module implements tools for transaction management:
//! - `transaction`: begin, commit or roll back on a session
//! - `get_transaction_status`: autocommit, isolation level and in-transaction flag
//!
//! Both need an established session; an ad hoc connection would be gone
//! before the next call could see the transaction.

use crate::db::{Connector, SessionRegistry, TransactionCoordinator};
use crate::error::codes;
use crate::models::{Response, TransactionOperation, TransactionParams};
use crate::tools::dispatcher::{failure, rejected, success};
use std::sync::Arc;
use std::time::Instant;

const SESSION_HINT: &str =
    "Please provide a session_id or first call test_connection to establish a session";

/// Handler for transaction tools.
pub struct TransactionToolHandler<C: Connector> {
    registry: Arc<SessionRegistry<C>>,
}

impl<C: Connector> TransactionToolHandler<C> {
    pub fn new(registry: Arc<SessionRegistry<C>>) -> Self {
        Self { registry }
    }

    pub async fn transaction(
        &self,
        session_id: Option<&str>,
        params: TransactionParams,
    ) -> Response {
        let start = Instant::now();

        let Some(operation) = params.operation.filter(|op| !op.is_empty()) else {
            return rejected(
                codes::INVALID_PARAMETERS,
                "Missing required parameter: operation",
                &format!(
                    "The transaction action requires an operation parameter ({})",
                    TransactionOperation::VALID_VALUES
                ),
            );
        };
        let Some(session_id) = session_id else {
            return rejected(
                codes::SESSION_REQUIRED,
                "Transaction management requires a session",
                SESSION_HINT,
            );
        };

        let mut guard = match self.registry.get(session_id).await {
            Ok(guard) => guard,
            Err(e) => return failure(&e, start),
        };

        match TransactionCoordinator::manage(
            &mut *guard,
            &operation,
            params.isolation_level.as_deref(),
        )
        .await
        {
            Ok(result) => success(&result, start),
            Err(e) => failure(&e, start),
        }
    }

    pub async fn get_transaction_status(&self, session_id: Option<&str>) -> Response {
        let start = Instant::now();

        let Some(session_id) = session_id else {
            return rejected(
                codes::SESSION_REQUIRED,
                "Transaction status check requires a session",
                SESSION_HINT,
            );
        };

        let mut guard = match self.registry.get(session_id).await {
            Ok(guard) => guard,
            Err(e) => return failure(&e, start),
        };

        match TransactionCoordinator::status(&mut *guard).await {
            Ok(status) => success(&status, start),
            Err(e) => failure(&e, start),
        }
    }
}
