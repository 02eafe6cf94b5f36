//! Action handlers.
//!
//! This module contains the request dispatcher and one handler per tool group:
//! - `test_connection`: open or reuse a session and report server details
//! - `execute_query`: run a statement
//! - `get_schema`: describe the current database
//! - `find_relationships`: explicit and inferred foreign keys
//! - `transaction`: begin, commit, rollback
//! - `get_transaction_status`: transaction state of a session

pub mod connection;
pub mod dispatcher;
pub mod query;
mod scope;
pub mod schema;
pub mod transaction;

pub use connection::{ConnectionTestOutput, ConnectionToolHandler};
pub use dispatcher::ActionDispatcher;
pub use query::QueryToolHandler;
pub use schema::SchemaToolHandler;
pub use transaction::TransactionToolHandler;
