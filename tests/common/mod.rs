//! Shared helpers for integration tests.
//!
//! Each test gets its own SQLite file in a temporary directory. The schema
//! is created over a separate writable connection before the server's
//! read-only pool is opened.

#![allow(dead_code)]

use readonly_sql_mcp::db::{ConnectionPool, SqliteAdapter};
use readonly_sql_mcp::mcp::Dispatcher;
use readonly_sql_mcp::mcp::protocol::{CallToolResult, JsonRpcRequest};
use readonly_sql_mcp::models::{ConnectionSettings, DatabaseKind, PoolSettings};
use readonly_sql_mcp::tools::build_registry;
use serde_json::{Value, json};
use sqlx::Connection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use std::str::FromStr;
use std::time::Duration;

pub struct TestDb {
    // Keeps the directory alive for the duration of the test
    _dir: tempfile::TempDir,
    pub url: String,
}

impl TestDb {
    pub fn settings(&self, max_connections: u32, acquire_timeout: Duration) -> ConnectionSettings {
        ConnectionSettings::new(DatabaseKind::Sqlite, self.url.clone()).with_pool(PoolSettings {
            max_connections,
            acquire_timeout,
            idle_timeout: Duration::from_secs(60),
        })
    }

    /// Open a writable side connection, bypassing the server.
    pub async fn writer(&self) -> SqliteConnection {
        let options = SqliteConnectOptions::from_str(&self.url)
            .unwrap()
            .create_if_missing(true);
        SqliteConnection::connect_with(&options).await.unwrap()
    }

    /// Row count of `table`, read over a side connection.
    pub async fn count(&self, table: &str) -> i64 {
        let mut conn = self.writer().await;
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        n
    }
}

/// Create a SQLite database file and run `setup` against it.
pub async fn sqlite_db(setup: &str) -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let db = TestDb { _dir: dir, url };

    let mut conn = db.writer().await;
    if !setup.trim().is_empty() {
        sqlx::raw_sql(setup).execute(&mut conn).await.unwrap();
    }
    conn.close().await.unwrap();
    db
}

pub async fn sqlite_pool(db: &TestDb, max_connections: u32) -> ConnectionPool<SqliteAdapter> {
    ConnectionPool::connect(
        SqliteAdapter::new(),
        &db.settings(max_connections, Duration::from_secs(5)),
    )
    .await
    .unwrap()
}

pub fn dispatcher(pool: &ConnectionPool<SqliteAdapter>) -> Dispatcher {
    Dispatcher::new(build_registry(pool.clone()))
}

/// Issue `tools/call` and decode the tool result.
pub async fn call_tool(dispatcher: &Dispatcher, name: &str, arguments: Value) -> CallToolResult {
    let request = JsonRpcRequest::new(
        1,
        "tools/call",
        Some(json!({ "name": name, "arguments": arguments })),
    );
    let response = dispatcher.handle(request).await.unwrap();
    assert!(response.error.is_none(), "JSON-RPC error: {:?}", response.error);
    serde_json::from_value(response.result.unwrap()).unwrap()
}

/// Text of every content block.
pub fn texts(result: &CallToolResult) -> Vec<&str> {
    result.content.iter().map(|c| c.as_text()).collect()
}

/// Parse the first content block of an `execute_query` result as rows.
pub fn rows(result: &CallToolResult) -> Vec<Value> {
    assert!(!result.is_error, "tool failed: {:?}", texts(result));
    serde_json::from_str(result.content[0].as_text()).unwrap()
}

/// Wait until the pool reports `expected` idle connections. Connections are
/// returned to the pool on a background task after release.
pub async fn wait_for_idle(pool: &ConnectionPool<SqliteAdapter>, expected: usize) -> bool {
    for _ in 0..100 {
        if pool.status().idle == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
