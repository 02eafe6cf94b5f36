//! Request envelope and per-action parameters.

use super::connection::ConnectionConfig;
use super::query::QueryParam;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One inbound request: where to connect, what to do, and with which session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Request {
    pub connection: ConnectionConfig,
    pub action: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Request {
    pub fn new(connection: ConnectionConfig, action: impl Into<String>) -> Self {
        Self {
            connection,
            action: action.into(),
            parameters: serde_json::Map::new(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// The actions the dispatcher routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TestConnection,
    ExecuteQuery,
    GetSchema,
    FindRelationships,
    Transaction,
    GetTransactionStatus,
}

impl Action {
    /// Match an action name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "test_connection" => Some(Self::TestConnection),
            "execute_query" => Some(Self::ExecuteQuery),
            "get_schema" => Some(Self::GetSchema),
            "find_relationships" => Some(Self::FindRelationships),
            "transaction" => Some(Self::Transaction),
            "get_transaction_status" => Some(Self::GetTransactionStatus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TestConnection => "test_connection",
            Self::ExecuteQuery => "execute_query",
            Self::GetSchema => "get_schema",
            Self::FindRelationships => "find_relationships",
            Self::Transaction => "transaction",
            Self::GetTransactionStatus => "get_transaction_status",
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteQueryParams {
    /// SQL statement to run
    #[serde(default)]
    pub query: Option<String>,
    /// Positional parameters for `?` placeholders
    #[serde(default)]
    pub params: Option<Vec<QueryParam>>,
    /// Report the statement's own execution time in the metadata
    #[serde(default)]
    pub include_performance_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetSchemaParams {
    /// One of basic, detailed, complete (default: basic)
    #[serde(default)]
    pub detail_level: Option<String>,
    /// Include foreign keys (default: true)
    #[serde(default = "default_true")]
    pub include_relationships: bool,
    /// Restrict to these tables
    #[serde(default)]
    pub tables: Option<Vec<String>>,
}

impl Default for GetSchemaParams {
    fn default() -> Self {
        Self {
            detail_level: None,
            include_relationships: true,
            tables: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FindRelationshipsParams {
    /// Restrict to these tables
    #[serde(default)]
    pub tables: Option<Vec<String>>,
    /// Infer relationships from column naming (default: true)
    #[serde(default = "default_true")]
    pub include_implicit: bool,
}

impl Default for FindRelationshipsParams {
    fn default() -> Self {
        Self {
            tables: None,
            include_implicit: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TransactionParams {
    /// begin, commit or rollback
    #[serde(default)]
    pub operation: Option<String>,
    /// Applied before `begin`: READ UNCOMMITTED, READ COMMITTED, REPEATABLE READ or SERIALIZABLE
    #[serde(default)]
    pub isolation_level: Option<String>,
}

/// Treat an empty table filter the same as no filter.
pub fn table_filter(tables: Option<&Vec<String>>) -> Option<&[String]> {
    tables.map(Vec::as_slice).filter(|t| !t.is_empty())
}
