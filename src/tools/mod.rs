//! Tool implementations.
//!
//! - `params`: parameter descriptors and argument validation
//! - `registry`: name to descriptor lookup used by the dispatcher
//! - `schema`: `list_tables`, `get_columns`
//! - `query`: `execute_query`

pub mod params;
pub mod query;
pub mod registry;
pub mod schema;

pub use params::{ParamDescriptor, ParamKind, ValidatedArgs};
pub use query::QueryToolHandler;
pub use registry::{ToolDescriptor, ToolRegistry};
pub use schema::SchemaToolHandler;

use crate::db::{ConnectionPool, DatabaseAdapter, ReadOnlyExecutor};
use std::sync::Arc;

/// Register the built-in tools against one pool.
pub fn build_registry<A: DatabaseAdapter>(pool: ConnectionPool<A>) -> ToolRegistry {
    let schema = Arc::new(SchemaToolHandler::new(pool.clone()));
    let query = Arc::new(QueryToolHandler::new(ReadOnlyExecutor::new(pool)));

    let mut registry = ToolRegistry::new();

    let handler = Arc::clone(&schema);
    registry.register(ToolDescriptor::new(
        schema::LIST_TABLES,
        schema::LIST_TABLES_DESCRIPTION,
        schema::LIST_TABLES_PARAMS,
        move |_args| {
            let handler = Arc::clone(&handler);
            async move { handler.list_tables_tool().await }
        },
    ));

    let handler = Arc::clone(&schema);
    registry.register(ToolDescriptor::new(
        schema::GET_COLUMNS,
        schema::GET_COLUMNS_DESCRIPTION,
        schema::GET_COLUMNS_PARAMS,
        move |args| {
            let handler = Arc::clone(&handler);
            async move {
                let table = args.require_str("table")?;
                handler.get_columns_tool(table).await
            }
        },
    ));

    registry.register(ToolDescriptor::new(
        query::EXECUTE_QUERY,
        query::EXECUTE_QUERY_DESCRIPTION,
        query::EXECUTE_QUERY_PARAMS,
        move |args| {
            let handler = Arc::clone(&query);
            async move {
                let sql = args.require_str("sql")?;
                handler.query_tool(sql).await
            }
        },
    ));

    registry
}
