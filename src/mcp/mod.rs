//! MCP server integration module.
//!
//! This module exposes the action handlers as MCP tools using the rmcp
//! framework.

pub mod service;

pub use service::MySqlService;
