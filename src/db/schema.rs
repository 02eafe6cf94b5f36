//! Schema introspection module.
//!
//! Builds a [`SchemaDescriptor`] for the connection's current database from
//! `information_schema`, at three increasing detail levels.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule. All catalog queries
//! go through [`ConnectionHandle::execute`] and read the JSON rows back with
//! the accessors at the bottom of this module. String columns are converted
//! to utf8mb4 in SQL so servers that report catalog strings as binary still
//! yield text. Any error aborts the whole call; no partial schema is returned.

use crate::db::handle::ConnectionHandle;
use crate::db::mysql::quote_ident;
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnDescriptor, ColumnSize, DetailLevel, ForeignKeyDescriptor, IndexDescriptor, QueryParam,
    Row, SchemaDescriptor, TableDescriptor, TriggerDescriptor,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;

/// Schema introspector for the current database.
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Describe the current database.
    ///
    /// Indexes are gathered at `detailed` and above; foreign keys at
    /// `detailed` and above when `include_relationships` is set; triggers
    /// and the CREATE TABLE statement only at `complete`.
    pub async fn get_schema<H: ConnectionHandle>(
        handle: &mut H,
        detail_level: DetailLevel,
        include_relationships: bool,
        tables: Option<&[String]>,
    ) -> DbResult<SchemaDescriptor> {
        let database = current_database(handle).await?;

        let charset_rows = fetch(
            handle,
            queries::SCHEMA_CHARSET,
            vec![QueryParam::from(database.as_str())],
        )
        .await?;
        let (character_set, collation) = charset_rows
            .first()
            .map(|row| (get_str(row, "character_set"), get_str(row, "collation")))
            .unwrap_or((None, None));

        let (sql, params) = with_table_filter(queries::LIST_TABLES, &database, tables, &["TABLE_NAME"]);
        let table_rows = fetch(handle, &format!("{} ORDER BY TABLE_NAME", sql), params).await?;

        let mut described = BTreeMap::new();
        for row in &table_rows {
            let Some(name) = get_str(row, "table_name") else {
                continue;
            };
            let mut table = TableDescriptor::new(&name);
            table.engine = get_str(row, "engine");
            table.row_count_estimate = get_u64(row, "table_rows");
            table.auto_increment = get_u64(row, "auto_increment");
            table.created = get_str(row, "create_time");
            table.updated = get_str(row, "update_time");
            table.comment = get_str(row, "table_comment");
            table.columns = list_columns(handle, &database, &name).await?;

            if detail_level.includes_indexes() {
                table = table.with_indexes(list_indexes(handle, &database, &name).await?);
                if include_relationships {
                    table = table.with_foreign_keys(list_foreign_keys(handle, &database, &name).await?);
                }
            }

            if detail_level.is_complete() {
                table = table
                    .with_triggers(list_triggers(handle, &database, &name).await?)
                    .with_create_statement(show_create_table(handle, &name).await?);
            }

            described.insert(name, table);
        }

        debug!(
            database = %database,
            tables = described.len(),
            detail_level = ?detail_level,
            "Introspected MySQL schema"
        );

        Ok(SchemaDescriptor {
            database,
            character_set,
            collation,
            tables: described,
        })
    }
}

/// Resolve the connection's current database, failing when none is selected.
pub(crate) async fn current_database<H: ConnectionHandle>(handle: &mut H) -> DbResult<String> {
    let rows = fetch(handle, queries::CURRENT_DATABASE, Vec::new()).await?;
    rows.first()
        .and_then(|row| get_str(row, "db_name"))
        .filter(|name| !name.is_empty())
        .ok_or(DbError::NoDatabaseSelected)
}

/// Run a catalog query and return its rows.
pub(crate) async fn fetch<H: ConnectionHandle>(
    handle: &mut H,
    sql: &str,
    params: Vec<QueryParam>,
) -> DbResult<Vec<Row>> {
    Ok(handle.execute(sql, &params).await?.into_rows())
}

/// Append `AND (col IN (?, ...) OR ...)` for an optional table filter.
///
/// The first bound parameter is always the schema name.
pub(crate) fn with_table_filter(
    base: &str,
    database: &str,
    tables: Option<&[String]>,
    columns: &[&str],
) -> (String, Vec<QueryParam>) {
    let mut params = vec![QueryParam::from(database)];
    let Some(tables) = tables.filter(|t| !t.is_empty()) else {
        return (base.to_string(), params);
    };

    let placeholders = vec!["?"; tables.len()].join(", ");
    let clauses: Vec<String> = columns
        .iter()
        .map(|col| format!("{} IN ({})", col, placeholders))
        .collect();
    for _ in columns {
        params.extend(tables.iter().map(|t| QueryParam::from(t.as_str())));
    }
    (format!("{} AND ({})", base, clauses.join(" OR ")), params)
}

async fn list_columns<H: ConnectionHandle>(
    handle: &mut H,
    database: &str,
    table: &str,
) -> DbResult<Vec<ColumnDescriptor>> {
    let rows = fetch(handle, queries::LIST_COLUMNS, schema_and_table(database, table)).await?;
    Ok(rows
        .iter()
        .map(|row| ColumnDescriptor {
            name: get_str(row, "column_name").unwrap_or_default(),
            position: get_u64(row, "ordinal_position").unwrap_or_default(),
            default: get_str(row, "column_default"),
            nullable: get_str(row, "is_nullable").as_deref() == Some("YES"),
            data_type: get_str(row, "data_type").unwrap_or_default(),
            column_type: get_str(row, "column_type").unwrap_or_default(),
            key: get_str(row, "column_key").unwrap_or_default(),
            extra: get_str(row, "extra").unwrap_or_default(),
            comment: get_str(row, "column_comment").unwrap_or_default(),
            size: ColumnSize::from_catalog(
                get_u64(row, "character_maximum_length"),
                get_u64(row, "numeric_precision"),
                get_u64(row, "numeric_scale"),
            ),
        })
        .collect())
}

/// One entry per (name, uniqueness, type, comment) group, columns in sequence order.
async fn list_indexes<H: ConnectionHandle>(
    handle: &mut H,
    database: &str,
    table: &str,
) -> DbResult<Vec<IndexDescriptor>> {
    let rows = fetch(handle, queries::LIST_INDEXES, schema_and_table(database, table)).await?;

    let mut indexes: Vec<IndexDescriptor> = Vec::new();
    for row in &rows {
        let name = get_str(row, "index_name").unwrap_or_default();
        let unique = get_u64(row, "non_unique") == Some(0);
        let index_type = get_str(row, "index_type").unwrap_or_default();
        let comment = get_str(row, "index_comment").unwrap_or_default();
        let column = get_str(row, "column_name");

        let existing = indexes.iter_mut().find(|idx| {
            idx.name == name
                && idx.unique == unique
                && idx.index_type == index_type
                && idx.comment == comment
        });
        match existing {
            Some(idx) => idx.columns.extend(column),
            None => indexes.push(IndexDescriptor {
                name,
                unique,
                columns: column.into_iter().collect(),
                index_type,
                comment,
            }),
        }
    }
    Ok(indexes)
}

async fn list_foreign_keys<H: ConnectionHandle>(
    handle: &mut H,
    database: &str,
    table: &str,
) -> DbResult<Vec<ForeignKeyDescriptor>> {
    let rows = fetch(handle, queries::LIST_FOREIGN_KEYS, schema_and_table(database, table)).await?;

    let mut foreign_keys: Vec<ForeignKeyDescriptor> = Vec::new();
    for row in &rows {
        let name = get_str(row, "constraint_name").unwrap_or_default();
        let column = get_str(row, "column_name").unwrap_or_default();
        let referenced_column = get_str(row, "referenced_column").unwrap_or_default();

        match foreign_keys.iter_mut().find(|fk| fk.name == name) {
            Some(fk) => {
                fk.columns.push(column);
                fk.referenced_columns.push(referenced_column);
            }
            None => foreign_keys.push(ForeignKeyDescriptor {
                name,
                columns: vec![column],
                referenced_table: get_str(row, "referenced_table").unwrap_or_default(),
                referenced_columns: vec![referenced_column],
                update_rule: get_str(row, "update_rule"),
                delete_rule: get_str(row, "delete_rule"),
            }),
        }
    }
    Ok(foreign_keys)
}

async fn list_triggers<H: ConnectionHandle>(
    handle: &mut H,
    database: &str,
    table: &str,
) -> DbResult<Vec<TriggerDescriptor>> {
    let rows = fetch(handle, queries::LIST_TRIGGERS, schema_and_table(database, table)).await?;
    Ok(rows
        .iter()
        .map(|row| TriggerDescriptor {
            name: get_str(row, "trigger_name").unwrap_or_default(),
            timing: get_str(row, "action_timing").unwrap_or_default(),
            event: get_str(row, "event_manipulation").unwrap_or_default(),
            statement: get_str(row, "action_statement").unwrap_or_default(),
        })
        .collect())
}

async fn show_create_table<H: ConnectionHandle>(
    handle: &mut H,
    table: &str,
) -> DbResult<Option<String>> {
    let sql = format!("SHOW CREATE TABLE {}", quote_ident(table));
    let rows = fetch(handle, &sql, Vec::new()).await?;
    // Second column is "Create Table" (or "Create View" for views)
    Ok(rows
        .first()
        .and_then(|row| row.values().nth(1))
        .and_then(json_to_string))
}

fn schema_and_table(database: &str, table: &str) -> Vec<QueryParam> {
    vec![QueryParam::from(database), QueryParam::from(table)]
}

// =============================================================================
// Row accessors
// =============================================================================

fn json_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Get a column as text. NULL and missing columns are `None`.
pub(crate) fn get_str(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(json_to_string)
}

/// Get a column as an unsigned integer, accepting numeric strings.
pub(crate) fn get_u64(row: &Row, column: &str) -> Option<u64> {
    match row.get(column)? {
        JsonValue::Number(n) => n.as_u64().or_else(|| n.as_i64().map(|v| v.max(0) as u64)),
        JsonValue::String(s) => s.parse().ok(),
        JsonValue::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

// =============================================================================
// SQL Queries
// =============================================================================

pub(crate) mod queries {
    pub const CURRENT_DATABASE: &str = "SELECT DATABASE() AS db_name";

    pub const SCHEMA_CHARSET: &str = r#"
        SELECT
            CONVERT(DEFAULT_CHARACTER_SET_NAME USING utf8mb4) AS character_set,
            CONVERT(DEFAULT_COLLATION_NAME USING utf8mb4) AS collation
        FROM information_schema.SCHEMATA
        WHERE SCHEMA_NAME = ?
        "#;

    /// Table filter and ORDER BY are appended by the caller.
    pub const LIST_TABLES: &str = r#"
        SELECT
            CONVERT(TABLE_NAME USING utf8mb4) AS table_name,
            CONVERT(ENGINE USING utf8mb4) AS engine,
            TABLE_ROWS AS table_rows,
            AUTO_INCREMENT AS auto_increment,
            CREATE_TIME AS create_time,
            UPDATE_TIME AS update_time,
            CONVERT(TABLE_COMMENT USING utf8mb4) AS table_comment
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ?"#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
            ORDINAL_POSITION AS ordinal_position,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS column_default,
            CONVERT(IS_NULLABLE USING utf8mb4) AS is_nullable,
            CONVERT(DATA_TYPE USING utf8mb4) AS data_type,
            CHARACTER_MAXIMUM_LENGTH AS character_maximum_length,
            NUMERIC_PRECISION AS numeric_precision,
            NUMERIC_SCALE AS numeric_scale,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS column_type,
            CONVERT(COLUMN_KEY USING utf8mb4) AS column_key,
            CONVERT(EXTRA USING utf8mb4) AS extra,
            CONVERT(COLUMN_COMMENT USING utf8mb4) AS column_comment
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;

    pub const LIST_INDEXES: &str = r#"
        SELECT
            CONVERT(INDEX_NAME USING utf8mb4) AS index_name,
            NON_UNIQUE AS non_unique,
            CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
            CONVERT(INDEX_TYPE USING utf8mb4) AS index_type,
            CONVERT(COMMENT USING utf8mb4) AS index_comment
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

    pub const LIST_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(k.CONSTRAINT_NAME USING utf8mb4) AS constraint_name,
            CONVERT(k.COLUMN_NAME USING utf8mb4) AS column_name,
            CONVERT(k.REFERENCED_TABLE_NAME USING utf8mb4) AS referenced_table,
            CONVERT(k.REFERENCED_COLUMN_NAME USING utf8mb4) AS referenced_column,
            CONVERT(rc.UPDATE_RULE USING utf8mb4) AS update_rule,
            CONVERT(rc.DELETE_RULE USING utf8mb4) AS delete_rule
        FROM information_schema.KEY_COLUMN_USAGE k
        JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
            ON rc.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
            AND rc.CONSTRAINT_NAME = k.CONSTRAINT_NAME
            AND rc.TABLE_NAME = k.TABLE_NAME
        WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ?
            AND k.REFERENCED_TABLE_NAME IS NOT NULL
        ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#;

    pub const LIST_TRIGGERS: &str = r#"
        SELECT
            CONVERT(TRIGGER_NAME USING utf8mb4) AS trigger_name,
            CONVERT(ACTION_TIMING USING utf8mb4) AS action_timing,
            CONVERT(EVENT_MANIPULATION USING utf8mb4) AS event_manipulation,
            CONVERT(ACTION_STATEMENT USING utf8mb4) AS action_statement
        FROM information_schema.TRIGGERS
        WHERE TRIGGER_SCHEMA = ? AND EVENT_OBJECT_TABLE = ?
        ORDER BY ACTION_ORDER
        "#;

    /// Explicit foreign keys across the schema. Filter and ORDER BY are appended.
    pub const LIST_RELATIONSHIPS: &str = r#"
        SELECT
            CONVERT(k.CONSTRAINT_NAME USING utf8mb4) AS constraint_name,
            CONVERT(k.TABLE_NAME USING utf8mb4) AS source_table,
            CONVERT(k.COLUMN_NAME USING utf8mb4) AS source_column,
            CONVERT(k.REFERENCED_TABLE_NAME USING utf8mb4) AS target_table,
            CONVERT(k.REFERENCED_COLUMN_NAME USING utf8mb4) AS target_column,
            CONVERT(rc.UPDATE_RULE USING utf8mb4) AS update_rule,
            CONVERT(rc.DELETE_RULE USING utf8mb4) AS delete_rule
        FROM information_schema.KEY_COLUMN_USAGE k
        JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
            ON rc.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
            AND rc.CONSTRAINT_NAME = k.CONSTRAINT_NAME
            AND rc.TABLE_NAME = k.TABLE_NAME
        WHERE k.TABLE_SCHEMA = ? AND k.REFERENCED_TABLE_NAME IS NOT NULL"#;

    pub const RELATIONSHIPS_ORDER: &str = " ORDER BY k.TABLE_NAME, k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

    /// Columns of base tables, for implicit inference. Filter and ORDER BY are appended.
    pub const LIST_BASE_TABLE_COLUMNS: &str = r#"
        SELECT
            CONVERT(c.TABLE_NAME USING utf8mb4) AS table_name,
            CONVERT(c.COLUMN_NAME USING utf8mb4) AS column_name,
            CONVERT(c.DATA_TYPE USING utf8mb4) AS data_type,
            CONVERT(c.COLUMN_KEY USING utf8mb4) AS column_key
        FROM information_schema.COLUMNS c
        JOIN information_schema.TABLES t
            ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
        WHERE c.TABLE_SCHEMA = ? AND t.TABLE_TYPE = 'BASE TABLE'"#;

    pub const BASE_TABLE_COLUMNS_ORDER: &str = " ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION";
}
