//! Schema introspection tools.
//!
//! This module implements the `list_tables` and `get_columns` tools.

use crate::db::{ConnectionPool, DatabaseAdapter};
use crate::error::{ServerError, ServerResult};
use crate::mcp::protocol::{CallToolResult, Content};
use crate::models::{ColumnInfo, TableList};
use crate::tools::params::ParamDescriptor;
use serde::Serialize;
use tracing::info;

pub const LIST_TABLES: &str = "list_tables";
pub const GET_COLUMNS: &str = "get_columns";

pub const LIST_TABLES_DESCRIPTION: &str =
    "List all tables in the configured database schema, sorted by name.";
pub const GET_COLUMNS_DESCRIPTION: &str = "Get column names, data types, nullability and \
     defaults for a table, in column order. An unknown table returns an empty list.";

pub const LIST_TABLES_PARAMS: &[ParamDescriptor] = &[];
pub const GET_COLUMNS_PARAMS: &[ParamDescriptor] =
    &[ParamDescriptor::string("table", "Name of the table to describe")
        .required()
        .non_empty()];

/// Pretty-printed JSON as a text block.
pub(crate) fn json_block<T: Serialize>(value: &T) -> ServerResult<Content> {
    serde_json::to_string_pretty(value)
        .map(Content::text)
        .map_err(|e| ServerError::internal(format!("Failed to serialize result: {}", e)))
}

/// Handler for schema tools.
pub struct SchemaToolHandler<A: DatabaseAdapter> {
    pool: ConnectionPool<A>,
}

impl<A: DatabaseAdapter> SchemaToolHandler<A> {
    pub fn new(pool: ConnectionPool<A>) -> Self {
        Self { pool }
    }

    pub async fn list_tables(&self) -> ServerResult<TableList> {
        let adapter = self.pool.adapter();
        let mut conn = self.pool.acquire().await?;
        let tables = adapter.list_tables(&mut conn).await?;
        conn.release();

        info!(
            schema = %adapter.schema_label(),
            count = tables.len(),
            "Listed tables"
        );
        Ok(TableList::new(adapter.schema_label(), tables))
    }

    pub async fn get_columns(&self, table: &str) -> ServerResult<Vec<ColumnInfo>> {
        let mut conn = self.pool.acquire().await?;
        let columns = self.pool.adapter().get_columns(&mut conn, table).await?;
        conn.release();

        info!(table = %table, count = columns.len(), "Described table");
        Ok(columns)
    }

    /// `list_tables` rendered as tool content.
    pub async fn list_tables_tool(&self) -> ServerResult<CallToolResult> {
        let list = self.list_tables().await?;
        Ok(CallToolResult::success(vec![
            Content::text(format!("Found {} tables in {}", list.count, list.schema)),
            json_block(&list.tables)?,
        ]))
    }

    /// `get_columns` rendered as tool content.
    pub async fn get_columns_tool(&self, table: &str) -> ServerResult<CallToolResult> {
        let columns = self.get_columns(table).await?;
        Ok(CallToolResult::success(vec![
            Content::text(format!("Columns for table: {}", table)),
            json_block(&columns)?,
        ]))
    }
}
