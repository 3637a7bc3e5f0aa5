//! Query tool.
//!
//! This module implements the `execute_query` tool. Any statement is
//! accepted; the read-only session guarantees nothing it does persists.

use crate::db::{DatabaseAdapter, ReadOnlyExecutor};
use crate::error::ServerResult;
use crate::mcp::protocol::{CallToolResult, Content};
use crate::models::QueryOutcome;
use crate::tools::params::ParamDescriptor;
use tracing::info;

pub const EXECUTE_QUERY: &str = "execute_query";

pub const EXECUTE_QUERY_DESCRIPTION: &str = "Execute a SQL statement in a read-only \
     transaction that is always rolled back. Returns the result rows as JSON.";

pub const EXECUTE_QUERY_PARAMS: &[ParamDescriptor] =
    &[ParamDescriptor::string("sql", "SQL statement to execute")
        .required()
        .non_empty()];

/// Handler for the query tool.
pub struct QueryToolHandler<A: DatabaseAdapter> {
    executor: ReadOnlyExecutor<A>,
}

impl<A: DatabaseAdapter> QueryToolHandler<A> {
    pub fn new(executor: ReadOnlyExecutor<A>) -> Self {
        Self { executor }
    }

    pub async fn query(&self, sql: &str) -> ServerResult<QueryOutcome> {
        let outcome = self.executor.run(sql).await?;
        info!(
            row_count = outcome.row_count,
            execution_time_ms = outcome.execution_time_ms,
            "Query executed"
        );
        Ok(outcome)
    }

    /// `execute_query` rendered as tool content: the rows, then a summary.
    pub async fn query_tool(&self, sql: &str) -> ServerResult<CallToolResult> {
        let outcome = self.query(sql).await?;
        Ok(CallToolResult::success(vec![
            Content::text(outcome.rows_json()),
            Content::text(outcome.summary()),
        ]))
    }
}
