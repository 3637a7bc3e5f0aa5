//! Schema-related data models.
//!
//! These are the shapes the schema tools serialize back to callers.

use serde::{Deserialize, Serialize};

/// Ordered table names for one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableList {
    pub schema: String,
    pub count: usize,
    pub tables: Vec<String>,
}

impl TableList {
    pub fn new(schema: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            schema: schema.into(),
            count: tables.len(),
            tables,
        }
    }
}

/// One column as reported by the catalog, in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    /// "YES" / "NO", as `information_schema` spells it
    pub is_nullable: String,
    pub column_default: Option<String>,
}

impl ColumnInfo {
    pub fn new(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        nullable: bool,
        column_default: Option<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: if nullable { "YES" } else { "NO" }.to_string(),
            column_default,
        }
    }
}
