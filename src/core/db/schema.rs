/// Schema Introspection Module
///
/// This module provides metadata about database structure: the live list
/// of tables, per-table column information, and primary-key discovery.
/// It also owns the identifier-safety boundary: SQLite cannot bind
/// identifiers as parameters, so every table name the engines interpolate
/// into a statement is first validated against the live catalog here.
use crate::core::{Result, ScoutError};
use rusqlite::{Connection, Row};

/// Represents a database column with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type name (e.g., "INTEGER", "TEXT", "REAL", "BLOB")
    pub type_name: String,
    /// Whether the column carries a NOT NULL constraint
    pub notnull: bool,
    /// Whether this column is flagged as part of the primary key
    pub pk: bool,
    /// Default value expression (if any)
    pub dflt_value: Option<String>,
}

impl Column {
    /// Creates a Column from a PRAGMA table_info result row
    fn from_pragma_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Column {
            name: row.get(1)?,
            type_name: row.get(2)?,
            notnull: row.get(3)?,
            pk: row.get(5)?,
            dflt_value: row.get(4)?,
        })
    }
}

/// Quotes a validated identifier for interpolation into a statement.
///
/// This is not a sanitizer: callers must whitelist the name against the
/// live catalog first. Quoting only guards names that collide with
/// keywords or carry unusual characters.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Lists the user-defined tables currently present in the database,
/// excluding the internal `sqlite_` catalog tables.
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type='table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;

    let table_iter = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for table_result in table_iter {
        names.push(table_result?);
    }
    Ok(names)
}

/// Whitelist check for a caller-supplied table name: exact match against
/// the live catalog, performed before the name is embedded into any
/// introspection or mutation statement.
///
/// # Errors
///
/// Returns `ScoutError::Schema` for unknown tables.
pub fn validate_table(conn: &Connection, table: &str) -> Result<()> {
    if table_names(conn)?.iter().any(|name| name == table) {
        Ok(())
    } else {
        Err(ScoutError::Schema(format!("unknown table: {}", table)))
    }
}

/// Retrieves column metadata for a table, in schema order.
///
/// # Errors
///
/// Returns `ScoutError::Schema` if the table does not exist.
pub fn columns(conn: &Connection, table: &str) -> Result<Vec<Column>> {
    validate_table(conn, table)?;

    let mut stmt = conn.prepare(&format!(
        "PRAGMA table_info({})",
        quote_identifier(table)
    ))?;
    let column_iter = stmt.query_map([], |row| Column::from_pragma_row(row))?;

    let mut columns = Vec::new();
    for column_result in column_iter {
        columns.push(column_result?);
    }
    Ok(columns)
}

/// Returns the table's single primary-key column, if it has exactly one.
///
/// Tables with no primary key, or with a composite key spanning several
/// columns, return `None`; those tables are browsable but the mutation
/// primitives that key on a primary key are disabled for them.
pub fn primary_key_column(conn: &Connection, table: &str) -> Result<Option<String>> {
    let flagged: Vec<String> = columns(conn, table)?
        .into_iter()
        .filter(|column| column.pk)
        .map(|column| column.name)
        .collect();

    match flagged.as_slice() {
        [single] => Ok(Some(single.clone())),
        _ => Ok(None),
    }
}
