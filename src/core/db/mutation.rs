/// Mutation Module
///
/// Insert, update, delete, and drop-table primitives keyed on the primary
/// key discovered through schema introspection. Every value travels as a
/// bound statement parameter; every identifier is whitelisted against the
/// live catalog before it is interpolated.
use crate::core::db::schema;
use crate::core::{Result, ScoutError};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;
use tracing::debug;

/// Strips the quoting from a single-quoted declared default so it can be
/// bound as the column value. Any other default expression is bound
/// verbatim.
fn unquote_default(default: &str) -> String {
    let trimmed = default.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].replace("''", "'")
    } else {
        trimmed.to_string()
    }
}

/// Inserts one row into `table`.
///
/// For each schema column in order: a supplied non-empty value is used;
/// otherwise a declared non-NULL default is bound; otherwise the column is
/// omitted entirely, leaving default application and NOT NULL enforcement
/// to the storage engine.
///
/// # Returns
///
/// The rowid generated for the inserted row.
///
/// # Errors
///
/// Returns `ScoutError::Validation` if the resulting column list is
/// empty, `ScoutError::Schema` for unknown tables, or `ScoutError::Query`
/// if the engine rejects the row.
pub fn insert(
    conn: &Connection,
    table: &str,
    values: &HashMap<String, String>,
) -> Result<i64> {
    let schema_columns = schema::columns(conn, table)?;

    let mut columns: Vec<String> = Vec::new();
    let mut parameters: Vec<String> = Vec::new();
    for column in &schema_columns {
        match values.get(&column.name) {
            Some(value) if !value.is_empty() => {
                columns.push(column.name.clone());
                parameters.push(value.clone());
            }
            _ => match &column.dflt_value {
                Some(default) if !default.eq_ignore_ascii_case("NULL") => {
                    columns.push(column.name.clone());
                    parameters.push(unquote_default(default));
                }
                _ => {}
            },
        }
    }

    if columns.is_empty() {
        return Err(ScoutError::Validation(format!(
            "no values to insert into {}",
            table
        )));
    }

    let column_list = columns
        .iter()
        .map(|name| schema::quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema::quote_identifier(table),
        column_list,
        placeholders
    );

    conn.execute(&sql, params_from_iter(parameters.iter()))
        .map_err(|e| ScoutError::Query(format!("insert failed: {}", e)))?;

    let rowid = conn.last_insert_rowid();
    debug!(table, rowid, "inserted row");
    Ok(rowid)
}

/// Updates the row of `table` whose `pk_column` equals `pk_value`,
/// setting every supplied column except the primary key itself (silently
/// excluded even if present in `values`). Single-row semantics.
///
/// # Errors
///
/// Returns `ScoutError::Validation` ("no fields to update") if the
/// set-list is empty after exclusion, `ScoutError::Schema` for unknown
/// tables or an unknown `pk_column`.
pub fn update_fields(
    conn: &Connection,
    table: &str,
    pk_column: &str,
    pk_value: &str,
    values: &HashMap<String, String>,
) -> Result<()> {
    let schema_columns = schema::columns(conn, table)?;

    if !schema_columns.iter().any(|c| c.name == pk_column) {
        return Err(ScoutError::Schema(format!(
            "unknown column: {}.{}",
            table, pk_column
        )));
    }

    // Iterate the schema, not the map, for a deterministic statement and
    // to filter the set-list to declared columns.
    let mut assignments: Vec<String> = Vec::new();
    let mut parameters: Vec<&str> = Vec::new();
    for column in &schema_columns {
        if column.name == pk_column {
            continue;
        }
        if let Some(value) = values.get(&column.name) {
            assignments.push(format!("{} = ?", schema::quote_identifier(&column.name)));
            parameters.push(value.as_str());
        }
    }

    if assignments.is_empty() {
        return Err(ScoutError::Validation("no fields to update".to_string()));
    }
    parameters.push(pk_value);

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        schema::quote_identifier(table),
        assignments.join(", "),
        schema::quote_identifier(pk_column)
    );

    conn.execute(&sql, params_from_iter(parameters))
        .map_err(|e| ScoutError::Query(format!("update failed: {}", e)))?;
    debug!(table, pk_column, "updated row");
    Ok(())
}

/// Deletes the rows of `table` whose primary key is in `pk_values`, in one
/// parameterized statement.
///
/// # Returns
///
/// The number of identifiers requested, reported as the deletion count
/// (not the engine's affected-row count).
///
/// # Errors
///
/// Returns `ScoutError::Constraint` ("no primary key found") if the table
/// has no single-column primary key; no partial deletion is performed.
pub fn delete_rows(conn: &Connection, table: &str, pk_values: &[String]) -> Result<usize> {
    let pk_column = schema::primary_key_column(conn, table)?
        .ok_or_else(|| ScoutError::Constraint("no primary key found".to_string()))?;

    if pk_values.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; pk_values.len()].join(", ");
    let sql = format!(
        "DELETE FROM {} WHERE {} IN ({})",
        schema::quote_identifier(table),
        schema::quote_identifier(&pk_column),
        placeholders
    );

    conn.execute(&sql, params_from_iter(pk_values.iter()))
        .map_err(|e| ScoutError::Query(format!("delete failed: {}", e)))?;
    debug!(table, count = pk_values.len(), "deleted rows");
    Ok(pk_values.len())
}

/// Drops `table` after re-checking it against the live catalog. Internal
/// catalog tables are refused even if a whitelist somehow carried one.
pub fn drop_table(conn: &Connection, table: &str) -> Result<()> {
    schema::validate_table(conn, table)?;
    if table.starts_with("sqlite_") {
        return Err(ScoutError::Schema(format!(
            "refusing to drop internal table: {}",
            table
        )));
    }

    conn.execute(
        &format!("DROP TABLE IF EXISTS {}", schema::quote_identifier(table)),
        [],
    )
    .map_err(|e| ScoutError::Query(format!("drop failed: {}", e)))?;
    debug!(table, "dropped table");
    Ok(())
}
