//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Rows produced by one read-only execution.
///
/// Each record maps column name to a JSON scalar in select-list order
/// (`serde_json` is built with `preserve_order`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl QueryOutcome {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<serde_json::Map<String, JsonValue>>,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows rendered as pretty JSON, the textual form returned to callers.
    pub fn rows_json(&self) -> String {
        serde_json::to_string_pretty(&self.rows).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn summary(&self) -> String {
        let noun = if self.row_count == 1 { "row" } else { "rows" };
        format!(
            "{} {} ({:.2} sec)",
            self.row_count,
            noun,
            self.execution_time_ms as f64 / 1000.0
        )
    }
}
