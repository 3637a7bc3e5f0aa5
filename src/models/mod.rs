//! Data models for the read-only SQL tool server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionSettings, DatabaseKind, PoolSettings};
pub use query::QueryOutcome;
pub use schema::{ColumnInfo, TableList};
