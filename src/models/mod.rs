//! Data models for the MySQL MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod relationship;
pub mod request;
pub mod response;
pub mod schema;
pub mod transaction;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DEFAULT_MYSQL_PORT, QueryRecord, SessionInfo};
pub use query::{QueryData, QueryOutcome, QueryParam, Row, STATEMENT_SUCCESS_STATUS};
pub use relationship::{
    ColumnPair, ExplicitRelationship, IMPLICIT_CONFIDENCE, ImplicitRelationship, Relationships,
};
pub use request::{
    Action, ExecuteQueryParams, FindRelationshipsParams, GetSchemaParams, Request,
    TransactionParams, table_filter,
};
pub use response::{ErrorDetail, Response, ResponseMetadata};
pub use schema::{
    ColumnDescriptor, ColumnSize, DetailLevel, ForeignKeyDescriptor, IndexDescriptor,
    SchemaDescriptor, TableDescriptor, TriggerDescriptor,
};
pub use transaction::{IsolationLevel, TransactionOperation, TransactionResult, TransactionStatus};
