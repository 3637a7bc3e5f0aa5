//! Row-to-JSON conversion.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies a column's type name into a logical category
//! 2. Engine-specific decoders extract the value for that category
//!
//! Every value ends up as a JSON scalar so result sets can be returned to the
//! caller as text.

use crate::models::{DatabaseKind, QueryOutcome};
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;
use std::time::Instant;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    Date,
    Time,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, kind: DatabaseKind) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC affinity is stored as a float
        if kind == DatabaseKind::Sqlite {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // "point" before "int" so PostgreSQL geometric types don't look like integers
    if lower.contains("point") || lower.contains("interval") {
        return TypeCategory::Unknown;
    }

    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.starts_with("timestamp") || lower == "datetime" {
        return TypeCategory::Timestamp;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }
    if lower.starts_with("time") {
        return TypeCategory::Time;
    }

    if lower.contains("char") || lower.contains("text") || lower == "name" || lower == "enum" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

/// Binary columns are returned as UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
    fn column_names(&self) -> Vec<String>;
}

/// Convert fetched rows into a `QueryOutcome`.
pub fn process_rows<R: RowToJson>(rows: Vec<R>, start: Instant) -> QueryOutcome {
    let columns = rows.first().map(|r| r.column_names()).unwrap_or_default();
    let json_rows = rows.iter().map(|r| r.to_json_map()).collect();
    QueryOutcome::new(columns, json_rows, start.elapsed().as_millis() as u64)
}

macro_rules! impl_row_to_json {
    ($row:ty, $kind:expr, $decoder:path) => {
        impl RowToJson for $row {
            fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let type_name = col.type_info().name();
                        let category = categorize_type(type_name, $kind);
                        (col.name().to_string(), $decoder(self, idx, category))
                    })
                    .collect()
            }

            fn column_names(&self) -> Vec<String> {
                self.columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect()
            }
        }
    };
}

impl_row_to_json!(MySqlRow, DatabaseKind::MySql, mysql::decode_column);
impl_row_to_json!(PgRow, DatabaseKind::Postgres, postgres::decode_column);
impl_row_to_json!(SqliteRow, DatabaseKind::Sqlite, sqlite::decode_column);

// =============================================================================
// Engine-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use sqlx::MySql;
    use sqlx::types::BigDecimal;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        if is_null(row, idx) {
            return JsonValue::Null;
        }
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Decimal => decode_with::<BigDecimal>(row, idx, to_string),
            TypeCategory::Boolean => decode_with::<bool>(row, idx, JsonValue::Bool),
            TypeCategory::Binary => decode_bytes(row, idx),
            TypeCategory::Json => decode_with::<JsonValue>(row, idx, |v| v),
            TypeCategory::Timestamp => decode_with::<NaiveDateTime>(row, idx, to_string),
            TypeCategory::Date => decode_with::<NaiveDate>(row, idx, to_string),
            TypeCategory::Time => decode_with::<NaiveTime>(row, idx, to_string),
            _ => decode_text(row, idx),
        }
    }

    fn is_null(row: &MySqlRow, idx: usize) -> bool {
        row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(false)
    }

    fn to_string<T: ToString>(v: T) -> JsonValue {
        JsonValue::String(v.to_string())
    }

    /// Typed decode for a non-NULL value, falling back to text on mismatch.
    fn decode_with<T>(row: &MySqlRow, idx: usize, map: impl FnOnce(T) -> JsonValue) -> JsonValue
    where
        T: for<'r> sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
    {
        match row.try_get::<T, _>(idx) {
            Ok(v) => map(v),
            Err(e) => {
                debug!(column = idx, error = %e, "Typed decode failed, falling back to text");
                decode_text(row, idx)
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<i8, _>(idx) {
            return JsonValue::Number(v.into());
        }
        // BIGINT UNSIGNED does not fit i64
        decode_with::<u64>(row, idx, |v| JsonValue::Number(v.into()))
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return float_value(v);
        }
        decode_with::<f32>(row, idx, |v| float_value(v as f64))
    }

    fn decode_bytes(row: &MySqlRow, idx: usize) -> JsonValue {
        match row.try_get_unchecked::<Vec<u8>, _>(idx) {
            Ok(v) => decode_binary_value(&v),
            Err(e) => {
                debug!(column = idx, error = %e, "Undecodable value");
                JsonValue::Null
            }
        }
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return JsonValue::String(v);
        }
        // Text-protocol values of unrecognised types arrive as bytes
        decode_bytes(row, idx)
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::Postgres;
    use sqlx::types::{BigDecimal, Uuid};

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        if is_null(row, idx) {
            return JsonValue::Null;
        }
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Decimal => decode_with::<BigDecimal>(row, idx, to_string),
            TypeCategory::Boolean => decode_with::<bool>(row, idx, JsonValue::Bool),
            TypeCategory::Binary => decode_with::<Vec<u8>>(row, idx, |v| decode_binary_value(&v)),
            TypeCategory::Json => decode_with::<JsonValue>(row, idx, |v| v),
            TypeCategory::Uuid => decode_with::<Uuid>(row, idx, to_string),
            TypeCategory::Timestamp => decode_timestamp(row, idx),
            TypeCategory::Date => decode_with::<NaiveDate>(row, idx, to_string),
            TypeCategory::Time => decode_with::<NaiveTime>(row, idx, to_string),
            _ => decode_text(row, idx),
        }
    }

    fn is_null(row: &PgRow, idx: usize) -> bool {
        row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(false)
    }

    fn to_string<T: ToString>(v: T) -> JsonValue {
        JsonValue::String(v.to_string())
    }

    /// Typed decode for a non-NULL value, falling back to text on mismatch.
    fn decode_with<T>(row: &PgRow, idx: usize, map: impl FnOnce(T) -> JsonValue) -> JsonValue
    where
        T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        match row.try_get::<T, _>(idx) {
            Ok(v) => map(v),
            Err(e) => {
                debug!(column = idx, error = %e, "Typed decode failed, falling back to text");
                decode_text(row, idx)
            }
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return JsonValue::Number(v.into());
        }
        decode_with::<i16>(row, idx, |v| JsonValue::Number(v.into()))
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return float_value(v);
        }
        decode_with::<f32>(row, idx, |v| float_value(v as f64))
    }

    fn decode_timestamp(row: &PgRow, idx: usize) -> JsonValue {
        // timestamptz decodes to DateTime<Utc>, plain timestamp to NaiveDateTime
        if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
            return JsonValue::String(v.to_rfc3339());
        }
        decode_with::<NaiveDateTime>(row, idx, to_string)
    }

    fn decode_text(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return JsonValue::String(v);
        }
        // Enums, citext and similar types carry their text as the binary form
        match row.try_get_unchecked::<String, _>(idx) {
            Ok(v) => JsonValue::String(v),
            Err(e) => {
                debug!(column = idx, error = %e, "Undecodable value");
                JsonValue::Null
            }
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => match row.try_get::<Option<i64>, _>(idx) {
                Ok(Some(v)) => JsonValue::Number(v.into()),
                Ok(None) => JsonValue::Null,
                Err(_) => decode_dynamic(row, idx),
            },
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float | TypeCategory::Decimal => {
                match row.try_get::<Option<f64>, _>(idx) {
                    Ok(Some(v)) => float_value(v),
                    Ok(None) => JsonValue::Null,
                    Err(_) => decode_dynamic(row, idx),
                }
            }
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| decode_binary_value(&v))
                .unwrap_or(JsonValue::Null),
            _ => decode_dynamic(row, idx),
        }
    }

    /// SQLite is dynamically typed: expression columns carry no declared
    /// type, so fall through the storage classes in turn.
    fn decode_dynamic(row: &SqliteRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
            return JsonValue::String(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return decode_binary_value(&v);
        }
        JsonValue::Null
    }
}
