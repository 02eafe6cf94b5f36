//! MCP service implementation using rmcp.
//!
//! This module defines the MySqlService struct with one MCP tool per action
//! of the request envelope. Every tool answers with the same response
//! envelope that the plain HTTP endpoint returns.

use crate::db::MySqlConnector;
use crate::models::{
    ConnectionConfig, ExecuteQueryParams, FindRelationshipsParams, GetSchemaParams, Response,
    TransactionParams,
};
use crate::tools::ActionDispatcher;
use rmcp::Json;
use rmcp::{
    ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars::JsonSchema,
    tool, tool_handler, tool_router,
};
use serde::Deserialize;

/// Input for the test_connection tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TestConnectionInput {
    /// MySQL server to connect to
    pub connection: ConnectionConfig,
    /// Existing session to check. A new session is opened if it is gone.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// MySQL server to connect to. Ignored when session_id is given.
    pub connection: ConnectionConfig,
    /// Session from test_connection. Without one, a connection is opened and closed for this call.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub params: ExecuteQueryParams,
}

/// Input for the get_schema tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSchemaInput {
    /// MySQL server to connect to. Must name a database. Ignored when session_id is given.
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub params: GetSchemaParams,
}

/// Input for the find_relationships tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindRelationshipsInput {
    /// MySQL server to connect to. Must name a database. Ignored when session_id is given.
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub params: FindRelationshipsParams,
}

/// Input for the transaction tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TransactionInput {
    /// Session from test_connection (required)
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub params: TransactionParams,
}

/// Input for the get_transaction_status tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TransactionStatusInput {
    /// Session from test_connection (required)
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Clone)]
pub struct MySqlService {
    /// Shared dispatcher; every clone uses the same session registry
    dispatcher: ActionDispatcher<MySqlConnector>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl MySqlService {
    pub fn new(dispatcher: ActionDispatcher<MySqlConnector>) -> Self {
        Self {
            dispatcher,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MySqlService {
    #[tool(
        description = "Connect to a MySQL server and report its version and current database.\nReturns a session_id; pass it to later calls to reuse the connection.\nIf session_id is given and still valid, that session is reused."
    )]
    async fn test_connection(
        &self,
        Parameters(input): Parameters<TestConnectionInput>,
    ) -> Json<Response> {
        Json(
            self.dispatcher
                .connections()
                .test_connection(&input.connection, input.session_id.as_deref())
                .await,
        )
    }

    #[tool(
        description = "Execute one SQL statement.\nSELECT-like statements return rows; INSERT/UPDATE/DELETE return the affected row count; other statements return a status.\nUse ? placeholders with `params`. Set include_performance_metrics for the statement's own execution time.\nStatements outside an explicit transaction are committed immediately."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> Json<Response> {
        Json(
            self.dispatcher
                .queries()
                .execute_query(&input.connection, input.session_id.as_deref(), input.params)
                .await,
        )
    }

    #[tool(
        description = "Describe the current database.\ndetail_level: basic (tables, columns), detailed (adds indexes and foreign keys), complete (adds triggers and CREATE TABLE).\nOptionally restrict to `tables`."
    )]
    async fn get_schema(&self, Parameters(input): Parameters<GetSchemaInput>) -> Json<Response> {
        Json(
            self.dispatcher
                .schema()
                .get_schema(&input.connection, input.session_id.as_deref(), input.params)
                .await,
        )
    }

    #[tool(
        description = "List foreign keys between tables, plus relationships inferred from column names and types (confidence: medium).\nSet include_implicit to false for declared foreign keys only."
    )]
    async fn find_relationships(
        &self,
        Parameters(input): Parameters<FindRelationshipsInput>,
    ) -> Json<Response> {
        Json(
            self.dispatcher
                .schema()
                .find_relationships(&input.connection, input.session_id.as_deref(), input.params)
                .await,
        )
    }

    #[tool(
        description = "Begin, commit or roll back a transaction on a session.\noperation: begin | commit | rollback. isolation_level (begin only): READ UNCOMMITTED, READ COMMITTED, REPEATABLE READ, SERIALIZABLE.\nRequires session_id from test_connection."
    )]
    async fn transaction(&self, Parameters(input): Parameters<TransactionInput>) -> Json<Response> {
        Json(
            self.dispatcher
                .transactions()
                .transaction(input.session_id.as_deref(), input.params)
                .await,
        )
    }

    #[tool(
        description = "Report whether a session is inside a transaction, its autocommit setting and isolation level.\nRequires session_id from test_connection."
    )]
    async fn get_transaction_status(
        &self,
        Parameters(input): Parameters<TransactionStatusInput>,
    ) -> Json<Response> {
        Json(
            self.dispatcher
                .transactions()
                .get_transaction_status(input.session_id.as_deref())
                .await,
        )
    }
}

#[tool_handler]
impl ServerHandler for MySqlService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mysql-mcp-server".to_owned(),
                title: Some("MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MySQL tools with session-scoped connections.\n\
                \n\
                ## Workflow\n\
                1. Call `test_connection` with connection details to get a `session_id`\n\
                2. Pass `session_id` to later calls to reuse that connection\n\
                3. Calls without `session_id` open a connection for that call only\n\
                \n\
                ## Transactions\n\
                `transaction` and `get_transaction_status` require a session. Statements run\n\
                between `begin` and `commit`/`rollback` on the same session are not auto-committed.\n\
                \n\
                ## Sessions\n\
                Sessions unused for longer than the session timeout are closed on the next request."
                    .to_string(),
            ),
        }
    }
}
