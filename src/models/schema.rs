//! Schema-related data models.
//!
//! This module defines the structured description produced by schema
//! introspection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How much metadata to gather per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Tables and columns only
    #[default]
    Basic,
    /// Adds indexes and foreign keys
    Detailed,
    /// Adds triggers and the CREATE TABLE statement
    Complete,
}

impl DetailLevel {
    pub const VALID_VALUES: &'static str = "basic, detailed, complete";

    /// Parse a detail level name. Names are matched exactly, as sent.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(Self::Basic),
            "detailed" => Some(Self::Detailed),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }

    pub fn includes_indexes(&self) -> bool {
        matches!(self, Self::Detailed | Self::Complete)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Schema of the connection's current database.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescriptor {
    pub database: String,
    pub character_set: Option<String>,
    pub collation: Option<String>,
    pub tables: BTreeMap<String, TableDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub engine: Option<String>,
    pub row_count_estimate: Option<u64>,
    pub auto_increment: Option<u64>,
    /// ISO-8601
    pub created: Option<String>,
    /// ISO-8601
    pub updated: Option<String>,
    pub comment: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<IndexDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_keys: Option<Vec<ForeignKeyDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<TriggerDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_statement: Option<String>,
}

impl TableDescriptor {
    /// Create a table descriptor with no columns and no optional sections.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine: None,
            row_count_estimate: None,
            auto_increment: None,
            created: None,
            updated: None,
            comment: None,
            columns: Vec::new(),
            indexes: None,
            foreign_keys: None,
            triggers: None,
            create_statement: None,
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<IndexDescriptor>) -> Self {
        self.indexes = Some(indexes);
        self
    }

    /// Attach foreign keys. An empty list leaves the section out.
    pub fn with_foreign_keys(mut self, foreign_keys: Vec<ForeignKeyDescriptor>) -> Self {
        if !foreign_keys.is_empty() {
            self.foreign_keys = Some(foreign_keys);
        }
        self
    }

    /// Attach triggers. An empty list leaves the section out.
    pub fn with_triggers(mut self, triggers: Vec<TriggerDescriptor>) -> Self {
        if !triggers.is_empty() {
            self.triggers = Some(triggers);
        }
        self
    }

    pub fn with_create_statement(mut self, ddl: Option<String>) -> Self {
        self.create_statement = ddl;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub position: u64,
    pub default: Option<String>,
    pub nullable: bool,
    pub data_type: String,
    pub column_type: String,
    /// PRI, UNI, MUL or empty
    pub key: String,
    pub extra: String,
    pub comment: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub size: Option<ColumnSize>,
}

/// Character length or numeric precision, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnSize {
    Length {
        max_length: u64,
    },
    Numeric {
        precision: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        scale: Option<u64>,
    },
}

impl ColumnSize {
    /// Pick the size from catalog values; zero and missing values count as absent.
    pub fn from_catalog(
        max_length: Option<u64>,
        precision: Option<u64>,
        scale: Option<u64>,
    ) -> Option<Self> {
        match (max_length, precision) {
            (Some(len), _) if len > 0 => Some(Self::Length { max_length: len }),
            (_, Some(precision)) if precision > 0 => Some(Self::Numeric {
                precision,
                scale: scale.filter(|s| *s > 0),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
    #[serde(rename = "type")]
    pub index_type: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerDescriptor {
    pub name: String,
    /// BEFORE or AFTER
    pub timing: String,
    /// INSERT, UPDATE or DELETE
    pub event: String,
    pub statement: String,
}
