//! MySQL value to JSON conversion.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's MySQL type name
//! 2. A per-category decoder extracts the value
//!
//! Binary values are rendered as lowercase hexadecimal text and temporal
//! values as ISO-8601 strings.

use crate::models::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row as _, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Timestamp,
    Binary,
    Json,
    Text,
}

/// Classify a MySQL type name (as reported by sqlx) into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();

    // Decimal first, "DECIMAL" must not fall through to anything numeric
    if upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC") {
        return TypeCategory::Decimal;
    }
    if upper == "BOOLEAN" || upper == "BOOL" {
        return TypeCategory::Boolean;
    }
    if upper.contains("INT") || upper == "YEAR" || upper == "BIT" {
        return TypeCategory::Integer;
    }
    if upper.starts_with("FLOAT") || upper.starts_with("DOUBLE") || upper == "REAL" {
        return TypeCategory::Float;
    }
    match upper.as_str() {
        "DATE" => return TypeCategory::Date,
        "TIME" => return TypeCategory::Time,
        "DATETIME" => return TypeCategory::DateTime,
        "TIMESTAMP" => return TypeCategory::Timestamp,
        "JSON" => return TypeCategory::Json,
        _ => {}
    }
    if upper.contains("BLOB") || upper.contains("BINARY") || upper == "GEOMETRY" {
        return TypeCategory::Binary;
    }
    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// DECIMAL values as their exact textual representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_uppercase();
        name.starts_with("DECIMAL") || name.starts_with("NUMERIC")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Formatting helpers
// =============================================================================

/// Lowercase hexadecimal rendering of raw bytes.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// ISO-8601 without offset; fractional seconds only when present.
pub fn iso_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn iso_time(value: &NaiveTime) -> String {
    value.format("%H:%M:%S%.f").to_string()
}

// =============================================================================
// Row to JSON
// =============================================================================

/// Convert a row into a JSON map keyed by column name, in column order.
pub fn row_to_json(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let type_name = col.type_info().name();
            let value = decode_column(row, idx, categorize_type(type_name));
            (col.name().to_string(), value)
        })
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Boolean => decode_boolean(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Date => decode_date(row, idx),
        TypeCategory::Time => decode_time(row, idx),
        TypeCategory::DateTime => decode_datetime(row, idx),
        TypeCategory::Timestamp => decode_timestamp(row, idx),
        TypeCategory::Binary => decode_binary(row, idx),
        TypeCategory::Json => decode_json(row, idx),
        TypeCategory::Text => decode_text(row, idx),
    }
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<RawDecimal>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL: {:?}", e);
            decode_text(row, idx)
        }
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    // Narrower signed types for drivers that refuse widening
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    decode_text(row, idx)
}

fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<bool>, _>(idx) {
        Ok(Some(v)) => JsonValue::Bool(v),
        Ok(None) => JsonValue::Null,
        Err(_) => decode_integer(row, idx),
    }
}

fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string()));
    }
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return serde_json::Number::from_f64(v as f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string()));
    }
    JsonValue::Null
}

fn decode_date(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<NaiveDate>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(v.format("%Y-%m-%d").to_string()),
        Ok(None) => JsonValue::Null,
        // Zero dates ('0000-00-00') do not fit NaiveDate
        Err(_) => decode_text(row, idx),
    }
}

fn decode_time(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<NaiveTime>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(iso_time(&v)),
        Ok(None) => JsonValue::Null,
        // TIME is an interval in MySQL and may be negative or exceed 24h
        Err(_) => decode_text(row, idx),
    }
}

fn decode_datetime(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<NaiveDateTime>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(iso_datetime(&v)),
        Ok(None) => JsonValue::Null,
        Err(_) => decode_text(row, idx),
    }
}

fn decode_timestamp(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        Ok(Some(v)) => JsonValue::String(iso_datetime(&v.naive_utc())),
        Ok(None) => JsonValue::Null,
        Err(_) => decode_datetime(row, idx),
    }
}

fn decode_binary(row: &MySqlRow, idx: usize) -> JsonValue {
    row.try_get::<Option<Vec<u8>>, _>(idx)
        .ok()
        .flatten()
        .map(|v| JsonValue::String(to_hex(&v)))
        .unwrap_or(JsonValue::Null)
}

fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
    match row.try_get::<Option<JsonValue>, _>(idx) {
        Ok(Some(v)) => v,
        Ok(None) => JsonValue::Null,
        Err(_) => decode_text(row, idx),
    }
}

/// Text, then raw bytes (UTF-8 if valid, hex otherwise).
fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
    }
    match row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s),
            Err(e) => JsonValue::String(to_hex(e.as_bytes())),
        },
        _ => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_integers() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("YEAR"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_other_types() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("DATETIME"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("LONGBLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("TEXT"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
    }

    #[test]
    fn test_to_hex_is_lowercase() {
        assert_eq!(to_hex(&[0xde, 0xad, 0xBE, 0xef]), "deadbeef");
        assert_eq!(to_hex(&[0x00, 0x0a]), "000a");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn test_iso_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(iso_datetime(&dt), "2024-03-09T14:05:00");

        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(14, 5, 0, 250_000)
            .unwrap();
        assert_eq!(iso_datetime(&dt), "2024-03-09T14:05:00.250");
    }
}
