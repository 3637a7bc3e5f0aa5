//! Read-only SQL tool server.
//!
//! Exposes `list_tables`, `get_columns` and `execute_query` to AI agents over
//! MCP. Statements run in a read-only transaction that is always rolled back,
//! so nothing a caller sends can persist a change. MySQL, PostgreSQL and
//! SQLite are supported through one adapter per engine.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{ServerError, ServerResult};
pub use mcp::Dispatcher;
