//! Relationship data models.

use serde::Serialize;

/// Confidence label attached to every inferred relationship.
pub const IMPLICIT_CONFIDENCE: &str = "medium";

/// A foreign key declared in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplicitRelationship {
    /// Constraint name
    pub name: String,
    pub source_table: String,
    pub target_table: String,
    /// Column pairs in declared ordinal order
    pub columns: Vec<ColumnPair>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

impl ExplicitRelationship {
    /// Whether `column` of `table` takes part in this constraint as a source column.
    pub fn covers(&self, table: &str, column: &str) -> bool {
        self.source_table == table && self.columns.iter().any(|c| c.source_column == column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnPair {
    pub source_column: String,
    pub target_column: String,
}

/// A relationship guessed from column naming and type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImplicitRelationship {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub confidence: String,
    pub reason: String,
}

impl ImplicitRelationship {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
        data_type: &str,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
            confidence: IMPLICIT_CONFIDENCE.to_string(),
            reason: format!("Column naming and type match: {}", data_type),
        }
    }
}

/// Result of relationship discovery.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Relationships {
    pub explicit: Vec<ExplicitRelationship>,
    pub implicit: Vec<ImplicitRelationship>,
}
