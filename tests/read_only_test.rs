//! Read-only guarantees, exercised through the tool surface.
//!
//! Every test runs against a scratch SQLite file; the schema is created
//! over a separate writable connection before the server pool is opened.

mod common;

use common::{call_tool, dispatcher, rows, sqlite_db, sqlite_pool, texts, wait_for_idle};
use serde_json::json;
use sqlx::Connection;

const ITEMS: &str = "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, price REAL);
     INSERT INTO items (id, name, price) VALUES (1, 'apple', 1.5), (2, 'pear', 2.25);";

#[tokio::test]
async fn test_select_returns_rows_in_column_order() {
    let db = sqlite_db(ITEMS).await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let result = call_tool(
        &d,
        "execute_query",
        json!({ "sql": "SELECT name, id FROM items ORDER BY id" }),
    )
    .await;

    let rows = rows(&result);
    assert_eq!(rows, vec![json!({"name": "apple", "id": 1}), json!({"name": "pear", "id": 2})]);
    // Column order follows the select list
    let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["name", "id"]);
    assert_eq!(texts(&result)[1].split(' ').take(2).collect::<Vec<_>>(), ["2", "rows"]);
}

#[tokio::test]
async fn test_insert_does_not_persist() {
    let db = sqlite_db(ITEMS).await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let result = call_tool(
        &d,
        "execute_query",
        json!({ "sql": "INSERT INTO items (id, name) VALUES (3, 'plum')" }),
    )
    .await;
    assert!(result.is_error);
    assert!(texts(&result)[0].starts_with("Error: "));

    assert_eq!(db.count("items").await, 2);
}

#[tokio::test]
async fn test_update_and_delete_do_not_persist() {
    let db = sqlite_db(ITEMS).await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    for sql in [
        "UPDATE items SET name = 'changed'",
        "DELETE FROM items",
        "DROP TABLE items",
    ] {
        let result = call_tool(&d, "execute_query", json!({ "sql": sql })).await;
        assert!(result.is_error, "{} should have been rejected", sql);
    }

    assert_eq!(db.count("items").await, 2);
    let still_there = call_tool(
        &d,
        "execute_query",
        json!({ "sql": "SELECT name FROM items WHERE id = 1" }),
    )
    .await;
    assert_eq!(rows(&still_there), vec![json!({"name": "apple"})]);
}

#[tokio::test]
async fn test_create_table_is_not_visible_afterwards() {
    let db = sqlite_db(ITEMS).await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let created = call_tool(
        &d,
        "execute_query",
        json!({ "sql": "CREATE TABLE sneaky (id INTEGER)" }),
    )
    .await;
    assert!(created.is_error);

    let listed = call_tool(&d, "list_tables", json!({})).await;
    let tables: Vec<String> = serde_json::from_str(texts(&listed)[1]).unwrap();
    assert_eq!(tables, vec!["items".to_string()]);
}

#[tokio::test]
async fn test_list_tables_is_sorted_and_stable() {
    let db = sqlite_db(
        "CREATE TABLE zebra (id INTEGER);
         CREATE TABLE alpha (id INTEGER);
         CREATE TABLE middle (id INTEGER);
         CREATE VIEW beta AS SELECT id FROM alpha;",
    )
    .await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let first = call_tool(&d, "list_tables", json!({})).await;
    let second = call_tool(&d, "list_tables", json!({})).await;

    assert!(!first.is_error);
    assert_eq!(first, second);
    assert_eq!(texts(&first)[0], "Found 4 tables in main");
    let tables: Vec<String> = serde_json::from_str(texts(&first)[1]).unwrap();
    assert_eq!(tables, ["alpha", "beta", "middle", "zebra"]);
}

#[tokio::test]
async fn test_get_columns_in_ordinal_order() {
    let db = sqlite_db(
        "CREATE TABLE people (id INTEGER NOT NULL, name TEXT, status TEXT DEFAULT 'new');",
    )
    .await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let result = call_tool(&d, "get_columns", json!({ "table": "people" })).await;
    assert!(!result.is_error);
    assert_eq!(texts(&result)[0], "Columns for table: people");

    let columns: Vec<serde_json::Value> = serde_json::from_str(texts(&result)[1]).unwrap();
    let names: Vec<&str> = columns
        .iter()
        .map(|c| c["column_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["id", "name", "status"]);
    assert_eq!(columns[0]["is_nullable"], "NO");
    assert_eq!(columns[1]["is_nullable"], "YES");
    assert_eq!(columns[2]["column_default"], "'new'");
}

#[tokio::test]
async fn test_get_columns_unknown_table_is_empty() {
    let db = sqlite_db(ITEMS).await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let result = call_tool(&d, "get_columns", json!({ "table": "no_such_table" })).await;
    assert!(!result.is_error);
    assert_eq!(texts(&result)[1], "[]");
}

#[tokio::test]
async fn test_blank_input_is_rejected_without_a_connection() {
    let db = sqlite_db(ITEMS).await;
    let pool = sqlite_pool(&db, 1).await;
    let d = dispatcher(&pool);

    // Hold the only connection: a call that reached the database would block
    let held = pool.acquire().await.unwrap();

    for (tool, args) in [
        ("execute_query", json!({ "sql": "" })),
        ("execute_query", json!({ "sql": "   \n\t" })),
        ("execute_query", json!({})),
        ("get_columns", json!({ "table": " " })),
        ("get_columns", json!({ "table": 42 })),
    ] {
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            call_tool(&d, tool, args.clone()),
        )
        .await
        .expect("validation must not wait for a connection");
        assert!(result.is_error, "{} {} should fail validation", tool, args);
        assert!(texts(&result)[0].starts_with("Error: "));
    }

    held.release();
}

#[tokio::test]
async fn test_failed_statement_returns_connection_to_pool() {
    let db = sqlite_db(ITEMS).await;
    // One connection, so every call reuses the same session
    let pool = sqlite_pool(&db, 1).await;
    let d = dispatcher(&pool);

    let warm = call_tool(&d, "execute_query", json!({ "sql": "SELECT 1 AS one" })).await;
    assert!(!warm.is_error);
    assert!(wait_for_idle(&pool, 1).await);

    for sql in [
        "SELECT missing_column FROM items",
        "SELEKT * FROM items",
        "INSERT INTO items (id, name) VALUES (9, 'x')",
    ] {
        let result = call_tool(&d, "execute_query", json!({ "sql": sql })).await;
        assert!(result.is_error, "{} should have failed", sql);

        assert!(
            wait_for_idle(&pool, 1).await,
            "after {:?}: {:?}",
            sql,
            pool.status()
        );
        assert_eq!(pool.status().size, 1);
        assert_eq!(pool.status().in_use(), 0);

        // The reused connection is back in read-write mode
        let mut conn = pool.acquire().await.unwrap();
        let query_only: i64 = sqlx::query_scalar("PRAGMA query_only")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(query_only, 0, "session left read-only after {:?}", sql);
        conn.release();
        assert!(wait_for_idle(&pool, 1).await);
    }
}

#[tokio::test]
async fn test_create_insert_select_yields_zero_rows() {
    let db = sqlite_db("").await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    // Schema set up outside the server, as an operator would
    let mut writer = db.writer().await;
    sqlx::raw_sql("CREATE TABLE t (id INTEGER)")
        .execute(&mut writer)
        .await
        .unwrap();
    writer.close().await.unwrap();

    let inserted = call_tool(
        &d,
        "execute_query",
        json!({ "sql": "INSERT INTO t (id) VALUES (1)" }),
    )
    .await;
    assert!(inserted.is_error);

    let selected = call_tool(&d, "execute_query", json!({ "sql": "SELECT * FROM t" })).await;
    assert_eq!(rows(&selected), Vec::<serde_json::Value>::new());
    assert_eq!(texts(&selected)[0], "[]");
}

#[tokio::test]
async fn test_utf8_values_round_trip() {
    let db = sqlite_db(
        "CREATE TABLE greetings (lang TEXT, text TEXT);
         INSERT INTO greetings VALUES ('ja', 'こんにちは'), ('emoji', '👋🌍'), ('de', 'Grüße');",
    )
    .await;
    let pool = sqlite_pool(&db, 2).await;
    let d = dispatcher(&pool);

    let result = call_tool(
        &d,
        "execute_query",
        json!({ "sql": "SELECT text FROM greetings ORDER BY lang" }),
    )
    .await;
    assert_eq!(
        rows(&result),
        vec![
            json!({"text": "Grüße"}),
            json!({"text": "👋🌍"}),
            json!({"text": "こんにちは"}),
        ]
    );
}
