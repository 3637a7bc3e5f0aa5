//! MySQL / MariaDB adapter.

use crate::db::adapter::{DatabaseAdapter, invalid_url};
use crate::db::types::process_rows;
use crate::error::ServerResult;
use crate::models::{ColumnInfo, ConnectionSettings, DatabaseKind, QueryOutcome};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Executor, MySql, Row};
use std::str::FromStr;
use std::time::Instant;

mod queries {
    // CONVERT(... USING utf8mb4) keeps information_schema columns decodable
    // as strings across MySQL 5.7, 8.x and MariaDB.
    pub const LIST_TABLES: &str = r#"
        SELECT CONVERT(TABLE_NAME USING utf8mb4) AS table_name
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
        ORDER BY TABLE_NAME
    "#;

    pub const GET_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
            CONVERT(DATA_TYPE USING utf8mb4) AS data_type,
            CONVERT(IS_NULLABLE USING utf8mb4) AS is_nullable,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS column_default
        FROM information_schema.COLUMNS
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = COALESCE(?, DATABASE())
        ORDER BY ORDINAL_POSITION
    "#;

    pub const SET_READ_ONLY: &str = "SET SESSION TRANSACTION READ ONLY";
    pub const BEGIN: &str = "START TRANSACTION";
    pub const ROLLBACK: &str = "ROLLBACK";
    pub const SET_READ_WRITE: &str = "SET SESSION TRANSACTION READ WRITE";
}

#[derive(Debug, Clone, Default)]
pub struct MySqlAdapter {
    /// `None` scopes catalog queries to `DATABASE()`.
    schema: Option<String>,
}

impl MySqlAdapter {
    pub fn new(schema: Option<String>) -> Self {
        Self { schema }
    }
}

impl DatabaseAdapter for MySqlAdapter {
    type Db = MySql;

    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    fn schema_label(&self) -> &str {
        self.schema.as_deref().unwrap_or("current database")
    }

    fn connect_options(&self, settings: &ConnectionSettings) -> ServerResult<MySqlConnectOptions> {
        let options = MySqlConnectOptions::from_str(&settings.connection_string)
            .map_err(|e| invalid_url(DatabaseKind::MySql, e))?
            .charset("utf8mb4");
        Ok(options)
    }

    async fn list_tables(&self, conn: &mut MySqlConnection) -> ServerResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_TABLES)
            .bind(self.schema.as_deref())
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(Into::into))
            .collect()
    }

    async fn get_columns(
        &self,
        conn: &mut MySqlConnection,
        table: &str,
    ) -> ServerResult<Vec<ColumnInfo>> {
        let rows = sqlx::query(queries::GET_COLUMNS)
            .bind(table)
            .bind(self.schema.as_deref())
            .fetch_all(&mut *conn)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let nullable: String = row.try_get("is_nullable")?;
            columns.push(ColumnInfo::new(
                row.try_get::<String, _>("column_name")?,
                row.try_get::<String, _>("data_type")?,
                nullable.eq_ignore_ascii_case("YES"),
                row.try_get::<Option<String>, _>("column_default")?,
            ));
        }
        Ok(columns)
    }

    async fn begin_read_only(&self, conn: &mut MySqlConnection) -> ServerResult<()> {
        // Session characteristics only apply to the next transaction, so the
        // flag has to be set before START TRANSACTION.
        (&mut *conn).execute(queries::SET_READ_ONLY).await?;
        (&mut *conn).execute(queries::BEGIN).await?;
        Ok(())
    }

    async fn execute(&self, conn: &mut MySqlConnection, sql: &str) -> ServerResult<QueryOutcome> {
        let start = Instant::now();
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        Ok(process_rows(rows, start))
    }

    async fn rollback(&self, conn: &mut MySqlConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::ROLLBACK).await?;
        Ok(())
    }

    async fn restore_read_write(&self, conn: &mut MySqlConnection) -> ServerResult<()> {
        (&mut *conn).execute(queries::SET_READ_WRITE).await?;
        Ok(())
    }

    // `SET @v`, `SET SESSION ...` and `CREATE TEMPORARY TABLE` are not
    // transactional in MySQL and outlive the ROLLBACK.
    fn rollback_resets_session(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_label_defaults_to_current_database() {
        assert_eq!(MySqlAdapter::new(None).schema_label(), "current database");
        assert_eq!(
            MySqlAdapter::new(Some("shop".to_string())).schema_label(),
            "shop"
        );
    }

    #[test]
    fn test_connect_options_rejects_garbage_url() {
        let adapter = MySqlAdapter::default();
        let settings = ConnectionSettings::new(DatabaseKind::MySql, "not a url");
        assert!(adapter.connect_options(&settings).is_err());
    }
}
