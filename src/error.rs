//! Error types for the read-only SQL tool server.
//!
//! Every failure reachable from a tool call is one of these variants. Only
//! `Connectivity` and `Config` are fatal, and only at startup; everything else
//! is turned into an error content block by the dispatcher.

use crate::mcp::protocol::CallToolResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Connection failed: {message}")]
    Connectivity { message: String, suggestion: String },

    #[error("Connection pool exhausted: no connection became available within {waited_secs}s")]
    PoolExhausted { waited_secs: u64 },

    #[error("Invalid parameter '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Query failed: {message}")]
    QueryExecution {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ServerError {
    /// Create a connectivity error with a helpful suggestion.
    pub fn connectivity(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn pool_exhausted(waited_secs: u64) -> Self {
        Self::PoolExhausted { waited_secs }
    }

    /// Create a validation error naming the offending field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn query_execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::QueryExecution {
            message: message.into(),
            sql_state,
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connectivity { suggestion, .. } => Some(suggestion),
            Self::PoolExhausted { .. } => {
                Some("The database is busy; retry the call or raise the pool size")
            }
            _ => None,
        }
    }

    /// Fatal errors abort startup. Nothing raised by a tool call is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::Config { .. })
    }

    /// Short classification used in logs and error content.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connectivity { .. } => "ConnectivityError",
            Self::PoolExhausted { .. } => "PoolExhausted",
            Self::Validation { .. } => "ValidationError",
            Self::QueryExecution { .. } => "QueryExecutionError",
            Self::UnknownTool { .. } => "UnknownTool",
            Self::Transport { .. } => "TransportError",
            Self::Config { .. } => "ConfigError",
            Self::Internal { .. } => "InternalError",
        }
    }

    /// Render this error as a tool result with `isError` set.
    pub fn to_tool_result(&self) -> CallToolResult {
        let text = match self {
            Self::QueryExecution {
                sql_state: Some(code),
                ..
            } => format!("Error: {} (SQLSTATE: {})", self, code),
            _ => format!("Error: {}", self),
        };
        CallToolResult::error(text)
    }
}

/// Convert sqlx errors to ServerError.
///
/// `PoolTimedOut` is reported with a zero wait because the configured bound
/// is not known here; `ConnectionPool::acquire` maps it with the real value.
impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => ServerError::connectivity(
                msg.to_string(),
                "Check the connection settings and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                ServerError::query_execution(db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut => ServerError::pool_exhausted(0),
            sqlx::Error::PoolClosed => ServerError::connectivity(
                "Connection pool is closed",
                "The server is shutting down",
            ),
            sqlx::Error::Io(io_err) => ServerError::connectivity(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => ServerError::connectivity(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => ServerError::connectivity(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::RowNotFound => ServerError::query_execution("No rows returned", None),
            sqlx::Error::ColumnNotFound(col) => {
                ServerError::query_execution(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnDecode { index, source } => {
                ServerError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                ServerError::internal(format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => ServerError::internal("Database worker crashed"),
            _ => ServerError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias used across the server.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::Content;

    fn text_of(result: &CallToolResult) -> &str {
        match &result.content[0] {
            Content::Text { text } => text,
        }
    }

    #[test]
    fn test_error_display() {
        let err = ServerError::connectivity("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_validation_names_field() {
        let err = ServerError::validation("sql", "must not be empty");
        assert_eq!(err.to_string(), "Invalid parameter 'sql': must not be empty");
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_only_startup_errors_are_fatal() {
        assert!(ServerError::connectivity("down", "start it").is_fatal());
        assert!(ServerError::config("bad port").is_fatal());
        assert!(!ServerError::pool_exhausted(30).is_fatal());
        assert!(!ServerError::query_execution("syntax", None).is_fatal());
        assert!(!ServerError::unknown_tool("drop_all").is_fatal());
        assert!(!ServerError::transport("closed").is_fatal());
    }

    #[test]
    fn test_pool_exhausted_is_distinct_from_query_failure() {
        let exhausted = ServerError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(exhausted, ServerError::PoolExhausted { .. }));
        assert_ne!(exhausted.kind(), "QueryExecutionError");
        assert!(exhausted.suggestion().is_some());
    }

    #[test]
    fn test_tool_result_marks_error() {
        let result = ServerError::unknown_tool("nope").to_tool_result();
        assert!(result.is_error);
        assert_eq!(text_of(&result), "Error: Unknown tool: nope");
    }

    #[test]
    fn test_tool_result_includes_sql_state() {
        let err = ServerError::query_execution("syntax error", Some("42601".to_string()));
        let result = err.to_tool_result();
        assert_eq!(
            text_of(&result),
            "Error: Query failed: syntax error (SQLSTATE: 42601)"
        );
    }

    #[test]
    fn test_tool_result_without_sql_state() {
        let err = ServerError::query_execution("syntax error", None);
        assert_eq!(text_of(&err.to_tool_result()), "Error: Query failed: syntax error");
    }
}
