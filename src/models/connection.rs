//! Connection-related data models.
//!
//! This module defines the database engine selector and the resolved
//! connection settings handed to the pool.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    /// Includes MariaDB
    #[value(name = "mysql", alias = "mariadb")]
    MySql,
    #[value(alias = "postgresql", alias = "pg")]
    Postgres,
    Sqlite,
}

impl DatabaseKind {
    /// Detect the engine from a connection URL scheme.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySql)
        } else if lower.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::Sqlite => "SQLite",
        }
    }

    /// URL scheme used when assembling a connection string from discrete fields.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySql => Some(3306),
            Self::Postgres => Some(5432),
            Self::Sqlite => None,
        }
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Pool sizing and timing, resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Bound on how long `acquire` waits before reporting exhaustion.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: crate::config::DEFAULT_POOL_SIZE,
            acquire_timeout: Duration::from_secs(crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(crate::config::DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

/// Everything an adapter needs to open its pool.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub kind: DatabaseKind,
    /// Contains sensitive data - never log, use `masked_connection_string`
    pub connection_string: String,
    /// Catalog schema that `list_tables` / `get_columns` are scoped to.
    /// `None` lets the adapter fall back to its engine default.
    pub schema: Option<String>,
    pub pool: PoolSettings,
}

impl ConnectionSettings {
    pub fn new(kind: DatabaseKind, connection_string: impl Into<String>) -> Self {
        Self {
            kind,
            connection_string: connection_string.into(),
            schema: None,
            pool: PoolSettings::default(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.schema = (!schema.is_empty()).then_some(schema);
        self
    }

    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    /// Display-safe version of the connection string (password masked).
    pub fn masked_connection_string(&self) -> String {
        match url::Url::parse(&self.connection_string) {
            Ok(mut url) if url.password().is_some() => {
                // set_password only fails for cannot-be-a-base URLs, which carry no password
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => self.connection_string.clone(),
        }
    }
}
