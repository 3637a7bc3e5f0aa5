//! PostgreSQL adapter.

use crate::db::adapter::{DatabaseAdapter, invalid_url};
use crate::db::types::process_rows;
use crate::error::ServerResult;
use crate::models::{ColumnInfo, ConnectionSettings, DatabaseKind, QueryOutcome};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Executor, Postgres, Row};
use std::str::FromStr;
use std::time::Instant;

pub const DEFAULT_SCHEMA: &str = "public";

mod queries {
    // information_schema columns are domain types (sql_identifier,
    // yes_or_no, ...); cast to text so they decode as String.
    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = $1
            AND table_type IN ('BASE TABLE', 'VIEW')
        ORDER BY table_name
    "#;

    pub const GET_COLUMNS: &str = r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            is_nullable::text AS is_nullable,
            column_default::text AS column_default
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position
    "#;

    pub const SET_READ_ONLY: &str = "SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY";
    pub const BEGIN: &str = "BEGIN";
    pub const ROLLBACK: &str = "ROLLBACK";
    pub const SET_READ_WRITE: &str = "SET SESSION CHARACTERISTICS AS TRANSACTION READ WRITE";
}

#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    schema: String,
}

impl PostgresAdapter {
    pub fn new(schema: Option<String>) -> Self {
        Self {
            schema: schema.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        }
    }
}

impl Default for PostgresAdapter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DatabaseAdapter for PostgresAdapter {
    type Db = Postgres;

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn schema_label(&self) -> &str {
        &self.schema
    }

    fn connect_options(&self, settings: &ConnectionSettings) -> ServerResult<PgConnectOptions> {
        let options = PgConnectOptions::from_str(&settings.connection_string)
            .map_err(|e| invalid_url(DatabaseKind::Postgres, e))?
            .application_name(env!("CARGO_PKG_NAME"));
        Ok(options)
    }

    async fn list_tables(&self, conn: &mut PgConnection) -> ServerResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_TABLES)
            .bind(&self.schema)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(Into::into))
            .collect()
    }

    async fn get_columns(
        &self,
        conn: &mut PgConnection,
        table: &str,
    ) -> ServerResult<Vec<ColumnInfo>> {
        let rows = sqlx::query(queries::GET_COLUMNS)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let nullable: String = row.try_get("is_nullable")?;
            columns.push(ColumnInfo::new(
                row.try_get::<String, _>("column_name")?,
                row.try_get::<String, _>("data_type")?,
                nullable == "YES",
                row.try_get::<Option<String>, _>("column_default")?,
            ));
        }
        Ok(columns)
    }

    async fn begin_read_only(&self, conn: &mut PgConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::SET_READ_ONLY).await?;
        (&mut *conn).execute(queries::BEGIN).await?;
        Ok(())
    }

    async fn execute(&self, conn: &mut PgConnection, sql: &str) -> ServerResult<QueryOutcome> {
        let start = Instant::now();
        // Extended protocol: a multi-statement string is rejected by the server
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        Ok(process_rows(rows, start))
    }

    async fn rollback(&self, conn: &mut PgConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::ROLLBACK).await?;
        Ok(())
    }

    async fn restore_read_write(&self, conn: &mut PgConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::SET_READ_WRITE).await?;
        Ok(())
    }
}
