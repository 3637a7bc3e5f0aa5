//! SQLite adapter.
//!
//! SQLite has no per-session transaction characteristics, so the read-only
//! session is expressed with `PRAGMA query_only`. The file itself is also
//! opened read-only, so a write fails even if the pragma were bypassed.

use crate::db::adapter::{DatabaseAdapter, invalid_url};
use crate::db::types::process_rows;
use crate::error::ServerResult;
use crate::models::{ColumnInfo, ConnectionSettings, DatabaseKind, QueryOutcome};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Executor, Row, Sqlite};
use std::str::FromStr;
use std::time::Instant;

pub const SCHEMA_LABEL: &str = "main";

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT name AS table_name
        FROM sqlite_master
        WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
        ORDER BY name
    "#;

    pub const GET_COLUMNS: &str = r#"
        SELECT
            name AS column_name,
            type AS data_type,
            "notnull" AS not_null,
            dflt_value AS column_default
        FROM pragma_table_info(?)
        ORDER BY cid
    "#;

    pub const SET_READ_ONLY: &str = "PRAGMA query_only = ON";
    pub const BEGIN: &str = "BEGIN";
    pub const ROLLBACK: &str = "ROLLBACK";
    pub const SET_READ_WRITE: &str = "PRAGMA query_only = OFF";
}

#[derive(Debug, Clone, Default)]
pub struct SqliteAdapter;

impl SqliteAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DatabaseAdapter for SqliteAdapter {
    type Db = Sqlite;

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    fn schema_label(&self) -> &str {
        SCHEMA_LABEL
    }

    fn connect_options(&self, settings: &ConnectionSettings) -> ServerResult<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&settings.connection_string)
            .map_err(|e| invalid_url(DatabaseKind::Sqlite, e))?
            .read_only(true)
            .create_if_missing(false);
        Ok(options)
    }

    async fn list_tables(&self, conn: &mut SqliteConnection) -> ServerResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(Into::into))
            .collect()
    }

    async fn get_columns(
        &self,
        conn: &mut SqliteConnection,
        table: &str,
    ) -> ServerResult<Vec<ColumnInfo>> {
        let rows = sqlx::query(queries::GET_COLUMNS)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let not_null: i64 = row.try_get("not_null")?;
            columns.push(ColumnInfo::new(
                row.try_get::<String, _>("column_name")?,
                row.try_get::<String, _>("data_type")?,
                not_null == 0,
                row.try_get::<Option<String>, _>("column_default")?,
            ));
        }
        Ok(columns)
    }

    async fn begin_read_only(&self, conn: &mut SqliteConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::SET_READ_ONLY).await?;
        (&mut *conn).execute(queries::BEGIN).await?;
        Ok(())
    }

    async fn execute(&self, conn: &mut SqliteConnection, sql: &str) -> ServerResult<QueryOutcome> {
        let start = Instant::now();
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        Ok(process_rows(rows, start))
    }

    async fn rollback(&self, conn: &mut SqliteConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::ROLLBACK).await?;
        Ok(())
    }

    async fn restore_read_write(&self, conn: &mut SqliteConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::SET_READ_WRITE).await?;
        Ok(())
    }
}
