//! Relationship discovery.
//!
//! Explicit relationships come from declared foreign keys. Implicit ones are
//! guessed from column names and types: a column `customer_id` in `orders`
//! is taken to reference the primary key of `customers` when the types agree.
//!
//! Inference compares every ordered pair of tables and every column pair
//! within them, so cost grows quadratically with the table count. This is
//! fine for schemas up to the low hundreds of tables.

use crate::db::handle::ConnectionHandle;
use crate::db::schema::{current_database, fetch, get_str, queries, with_table_filter};
use crate::error::DbResult;
use crate::models::{ColumnPair, ExplicitRelationship, ImplicitRelationship, Relationships};
use tracing::debug;

/// Column facts needed for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFacts {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
}

/// A base table and its columns in ordinal order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<ColumnFacts>,
}

impl TableColumns {
    fn primary_keys(&self) -> impl Iterator<Item = &ColumnFacts> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

pub struct RelationshipInferencer;

impl RelationshipInferencer {
    /// Find explicit relationships touching `tables` (all when `None`), plus
    /// implicit ones among `tables` when `include_implicit` is set.
    pub async fn find_relationships<H: ConnectionHandle>(
        handle: &mut H,
        tables: Option<&[String]>,
        include_implicit: bool,
    ) -> DbResult<Relationships> {
        let database = current_database(handle).await?;

        let explicit = list_explicit(handle, &database, tables).await?;
        let implicit = if include_implicit {
            let catalog = list_base_table_columns(handle, &database, tables).await?;
            infer_implicit(&catalog, &explicit)
        } else {
            Vec::new()
        };

        debug!(
            database = %database,
            explicit = explicit.len(),
            implicit = implicit.len(),
            "Discovered relationships"
        );

        Ok(Relationships { explicit, implicit })
    }
}

async fn list_explicit<H: ConnectionHandle>(
    handle: &mut H,
    database: &str,
    tables: Option<&[String]>,
) -> DbResult<Vec<ExplicitRelationship>> {
    let (sql, params) = with_table_filter(
        queries::LIST_RELATIONSHIPS,
        database,
        tables,
        &["k.TABLE_NAME", "k.REFERENCED_TABLE_NAME"],
    );
    let rows = fetch(handle, &format!("{}{}", sql, queries::RELATIONSHIPS_ORDER), params).await?;

    let mut relationships: Vec<ExplicitRelationship> = Vec::new();
    for row in &rows {
        let name = get_str(row, "constraint_name").unwrap_or_default();
        let source_table = get_str(row, "source_table").unwrap_or_default();
        let pair = ColumnPair {
            source_column: get_str(row, "source_column").unwrap_or_default(),
            target_column: get_str(row, "target_column").unwrap_or_default(),
        };

        // Composite keys arrive as consecutive rows of the same constraint
        match relationships
            .iter_mut()
            .find(|r| r.source_table == source_table && r.name == name)
        {
            Some(existing) => existing.columns.push(pair),
            None => relationships.push(ExplicitRelationship {
                name,
                source_table,
                target_table: get_str(row, "target_table").unwrap_or_default(),
                columns: vec![pair],
                update_rule: get_str(row, "update_rule"),
                delete_rule: get_str(row, "delete_rule"),
            }),
        }
    }
    Ok(relationships)
}

async fn list_base_table_columns<H: ConnectionHandle>(
    handle: &mut H,
    database: &str,
    tables: Option<&[String]>,
) -> DbResult<Vec<TableColumns>> {
    let (sql, params) = with_table_filter(
        queries::LIST_BASE_TABLE_COLUMNS,
        database,
        tables,
        &["c.TABLE_NAME"],
    );
    let rows = fetch(handle, &format!("{}{}", sql, queries::BASE_TABLE_COLUMNS_ORDER), params).await?;

    let mut catalog: Vec<TableColumns> = Vec::new();
    for row in &rows {
        let table = get_str(row, "table_name").unwrap_or_default();
        let column = ColumnFacts {
            name: get_str(row, "column_name").unwrap_or_default(),
            data_type: get_str(row, "data_type").unwrap_or_default(),
            primary_key: get_str(row, "column_key").as_deref() == Some("PRI"),
        };
        match catalog.last_mut() {
            Some(last) if last.table == table => last.columns.push(column),
            _ => catalog.push(TableColumns {
                table,
                columns: vec![column],
            }),
        }
    }
    Ok(catalog)
}

/// Infer relationships from naming and type.
///
/// For each source column not covered by an explicit foreign key, a target
/// primary-key column of the same data type matches when either:
/// - the column name ends in `_id`/`id` and what precedes the suffix equals,
///   or is a prefix of, the target table name (case-insensitive)
/// - the column name is identical to the target primary-key column name
///
/// Bare `id` columns never act as sources. A pair matched by both rules is
/// reported once.
pub fn infer_implicit(
    catalog: &[TableColumns],
    explicit: &[ExplicitRelationship],
) -> Vec<ImplicitRelationship> {
    let mut found: Vec<ImplicitRelationship> = Vec::new();

    for source in catalog {
        for column in &source.columns {
            if is_generic_id(&column.name)
                || explicit.iter().any(|fk| fk.covers(&source.table, &column.name))
            {
                continue;
            }
            let base = strip_id_suffix(&column.name);

            for target in catalog.iter().filter(|t| t.table != source.table) {
                let target_name = target.table.to_lowercase();
                let name_match = base
                    .as_deref()
                    .is_some_and(|base| !base.is_empty() && target_name.starts_with(base));

                for pk in target.primary_keys() {
                    if pk.data_type != column.data_type {
                        continue;
                    }
                    if !(name_match || pk.name == column.name) {
                        continue;
                    }
                    let candidate = ImplicitRelationship::new(
                        &source.table,
                        &column.name,
                        &target.table,
                        &pk.name,
                        &column.data_type,
                    );
                    if !found.contains(&candidate) {
                        found.push(candidate);
                    }
                }
            }
        }
    }
    found
}

fn is_generic_id(column: &str) -> bool {
    matches!(column.to_lowercase().as_str(), "id" | "_id")
}

/// `customer_id` -> `customer`, `customerid` -> `customer`. `None` without the suffix.
fn strip_id_suffix(column: &str) -> Option<String> {
    let lower = column.to_lowercase();
    lower
        .strip_suffix("_id")
        .or_else(|| lower.strip_suffix("id"))
        .map(str::to_string)
}
