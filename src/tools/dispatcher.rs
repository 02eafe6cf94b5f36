//! Request envelope routing.
//!
//! [`ActionDispatcher::handle`] decodes one [`Request`], routes it by action
//! name to a tool handler and always answers with a [`Response`]. Errors never
//! leave this layer; they become the envelope's `error` block.

use crate::db::{Connector, SessionRegistry};
use crate::error::{DbError, codes};
use crate::models::{
    Action, ErrorDetail, ExecuteQueryParams, FindRelationshipsParams, GetSchemaParams, Request,
    Response, TransactionParams,
};
use crate::tools::connection::ConnectionToolHandler;
use crate::tools::query::QueryToolHandler;
use crate::tools::schema::SchemaToolHandler;
use crate::tools::transaction::TransactionToolHandler;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Routes request envelopes to the tool handlers.
///
/// Holds the one [`SessionRegistry`] created at startup; clones share it.
pub struct ActionDispatcher<C: Connector> {
    registry: Arc<SessionRegistry<C>>,
}

impl<C: Connector> Clone for ActionDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C: Connector> ActionDispatcher<C> {
    pub fn new(registry: Arc<SessionRegistry<C>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<C>> {
        &self.registry
    }

    pub fn connections(&self) -> ConnectionToolHandler<C> {
        ConnectionToolHandler::new(Arc::clone(&self.registry))
    }

    pub fn queries(&self) -> QueryToolHandler<C> {
        QueryToolHandler::new(Arc::clone(&self.registry))
    }

    pub fn schema(&self) -> SchemaToolHandler<C> {
        SchemaToolHandler::new(Arc::clone(&self.registry))
    }

    pub fn transactions(&self) -> TransactionToolHandler<C> {
        TransactionToolHandler::new(Arc::clone(&self.registry))
    }

    /// Handle one request envelope.
    pub async fn handle(&self, request: Request) -> Response {
        let Request {
            connection,
            action: action_name,
            parameters,
            session_id,
        } = request;

        let Some(action) = Action::parse(&action_name) else {
            warn!(action = %action_name, "Unsupported action");
            return Response::failure(
                ErrorDetail::new(
                    codes::UNSUPPORTED_ACTION,
                    format!("The action '{}' is not supported.", action_name),
                )
                .with_details("Please check the documentation for supported actions."),
                None,
            );
        };

        debug!(
            action = action.as_str(),
            session_id = ?session_id,
            host = %connection.host,
            "Dispatching request"
        );

        let session_id = session_id.as_deref();
        match action {
            Action::TestConnection => {
                self.connections()
                    .test_connection(&connection, session_id)
                    .await
            }
            Action::ExecuteQuery => match parse_params::<ExecuteQueryParams>(parameters) {
                Ok(params) => {
                    self.queries()
                        .execute_query(&connection, session_id, params)
                        .await
                }
                Err(response) => response,
            },
            Action::GetSchema => match parse_params::<GetSchemaParams>(parameters) {
                Ok(params) => self.schema().get_schema(&connection, session_id, params).await,
                Err(response) => response,
            },
            Action::FindRelationships => match parse_params::<FindRelationshipsParams>(parameters)
            {
                Ok(params) => {
                    self.schema()
                        .find_relationships(&connection, session_id, params)
                        .await
                }
                Err(response) => response,
            },
            Action::Transaction => match parse_params::<TransactionParams>(parameters) {
                Ok(params) => self.transactions().transaction(session_id, params).await,
                Err(response) => response,
            },
            Action::GetTransactionStatus => {
                self.transactions().get_transaction_status(session_id).await
            }
        }
    }
}

/// Decode an action's parameter map into its typed form.
fn parse_params<T: DeserializeOwned>(
    parameters: serde_json::Map<String, JsonValue>,
) -> Result<T, Response> {
    serde_json::from_value(JsonValue::Object(parameters)).map_err(|e| {
        Response::failure(
            ErrorDetail::new(codes::INVALID_PARAMETERS, "Invalid parameters")
                .with_details(e.to_string()),
            None,
        )
    })
}

/// Successful envelope carrying `data`.
pub(crate) fn success<T: Serialize>(data: &T, start: Instant) -> Response {
    match serde_json::to_value(data) {
        Ok(value) => Response::success(value, start.elapsed()),
        Err(e) => failure(&DbError::internal("SerializationError", e.to_string()), start),
    }
}

/// Failed envelope for an error raised after parameter validation.
pub(crate) fn failure(error: &DbError, start: Instant) -> Response {
    Response::failure(error.to_error_detail(), Some(start.elapsed()))
}

/// Failed envelope for a request rejected before any work started.
pub(crate) fn rejected(code: &str, message: &str, details: &str) -> Response {
    Response::failure(ErrorDetail::new(code, message).with_details(details), None)
}
