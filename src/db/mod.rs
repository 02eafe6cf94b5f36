//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection capability interface and the MySQL implementation
//! - Session registry with lazy expiry
//! - Query execution
//! - Transaction coordination
//! - Schema introspection and relationship discovery
//! - Type mappings

pub mod executor;
pub mod handle;
pub mod mysql;
pub mod params;
pub mod relationships;
pub mod schema;
pub mod session;
pub mod transaction;
pub mod types;

pub use executor::{QueryExecutor, StatementKind};
pub use handle::{ConnectionHandle, Connector, StatementOutput};
pub use mysql::{MySqlConnector, MySqlHandle};
pub use relationships::RelationshipInferencer;
pub use schema::SchemaIntrospector;
pub use session::{SessionGuard, SessionRegistry};
pub use transaction::TransactionCoordinator;
