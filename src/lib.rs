//! MySQL MCP Server Library
//!
//! Session-scoped MySQL connections, transaction coordination, schema
//! introspection and relationship discovery, reached through a
//! request/response envelope or as MCP tools.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use mcp::MySqlService;
pub use tools::ActionDispatcher;
