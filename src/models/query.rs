//! Query-related data models.
//!
//! This module defines statement parameters and the outcome of running one
//! statement against a session's connection.

use crate::error::DbResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// One result row: column name to value, in the descriptor's column order.
pub type Row = serde_json::Map<String, JsonValue>;

/// Status reported for statements that neither return rows nor modify rows.
pub const STATEMENT_SUCCESS_STATUS: &str = "Query executed successfully";

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// What a successful statement produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryData {
    /// The statement returned a result set
    Rows(Vec<Row>),
    /// INSERT/UPDATE/DELETE affected-row count
    Affected(u64),
    /// Any other statement (DDL, SET, ...)
    Status(String),
}

impl QueryData {
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Rows(rows) => rows.len() as u64,
            Self::Affected(count) => *count,
            Self::Status(_) => 0,
        }
    }
}

/// Result of executing one statement, with the elapsed time reported on
/// both success and failure.
#[derive(Debug)]
pub struct QueryOutcome {
    pub result: DbResult<QueryData>,
    pub execution_time: Duration,
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn row_count(&self) -> Option<u64> {
        self.result.as_ref().ok().map(QueryData::row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[test]
    fn test_query_param_deserialization() {
        let params: Vec<QueryParam> =
            serde_json::from_str(r#"[null, true, 42, 1.5, "text"]"#).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(42),
                QueryParam::Float(1.5),
                QueryParam::String("text".into()),
            ]
        );
    }

    #[test]
    fn test_query_data_serializes_untagged() {
        let mut row = Row::new();
        row.insert("x".into(), JsonValue::from(1));
        let rows = QueryData::Rows(vec![row]);
        assert_eq!(serde_json::to_value(&rows).unwrap(), serde_json::json!([{"x": 1}]));
        assert_eq!(serde_json::to_value(QueryData::Affected(3)).unwrap(), serde_json::json!(3));
        assert_eq!(
            serde_json::to_value(QueryData::Status(STATEMENT_SUCCESS_STATUS.into())).unwrap(),
            serde_json::json!("Query executed successfully")
        );
    }

    #[test]
    fn test_row_count() {
        assert_eq!(QueryData::Rows(vec![Row::new(), Row::new()]).row_count(), 2);
        assert_eq!(QueryData::Affected(5).row_count(), 5);
        assert_eq!(QueryData::Status("ok".into()).row_count(), 0);
    }

    #[test]
    fn test_failed_outcome_has_no_row_count() {
        let outcome = QueryOutcome {
            result: Err(DbError::invalid_input("boom")),
            execution_time: Duration::from_millis(3),
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.row_count(), None);
    }
}
