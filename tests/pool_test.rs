//! Pool bound and exhaustion behaviour.

mod common;

use common::{call_tool, dispatcher, rows, sqlite_db, sqlite_pool, texts};
use readonly_sql_mcp::ServerError;
use readonly_sql_mcp::db::{ConnectionPool, ReadOnlyExecutor, SqliteAdapter};
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_concurrent_queries_stay_within_bound() {
    let db = sqlite_db(
        "CREATE TABLE n (v INTEGER);
         INSERT INTO n VALUES (1), (2), (3);",
    )
    .await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let d = d.clone();
        handles.push(tokio::spawn(async move {
            call_tool(&d, "execute_query", json!({ "sql": "SELECT SUM(v) AS total FROM n" })).await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(rows(&result), vec![json!({"total": 6})]);
    }

    let status = pool.status();
    assert_eq!(status.max, 2);
    assert!(status.size <= 2, "pool grew to {}", status.size);
}

#[tokio::test]
async fn test_exhausted_pool_reports_error_within_timeout() {
    let db = sqlite_db("CREATE TABLE t (id INTEGER);").await;
    let settings = db.settings(1, Duration::from_millis(300));
    let pool = ConnectionPool::connect(SqliteAdapter::new(), &settings)
        .await
        .unwrap();
    let executor = ReadOnlyExecutor::new(pool.clone());

    let held = pool.acquire().await.unwrap();

    let start = Instant::now();
    let err = executor.run("SELECT * FROM t").await.unwrap_err();
    assert!(matches!(err, ServerError::PoolExhausted { .. }), "got {:?}", err);
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(!err.is_fatal());

    // Once the holder lets go the next caller proceeds
    held.release();
    let outcome = executor.run("SELECT * FROM t").await.unwrap();
    assert_eq!(outcome.row_count, 0);
}

#[tokio::test]
async fn test_exhaustion_surfaces_as_tool_error() {
    let db = sqlite_db("CREATE TABLE t (id INTEGER);").await;
    let settings = db.settings(1, Duration::from_millis(200));
    let pool = ConnectionPool::connect(SqliteAdapter::new(), &settings)
        .await
        .unwrap();
    let d = dispatcher(&pool);

    let held = pool.acquire().await.unwrap();
    let result = call_tool(&d, "list_tables", json!({})).await;
    assert!(result.is_error);
    assert!(texts(&result)[0].starts_with("Error: "));
    held.release();
}
