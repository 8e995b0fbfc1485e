/// Query Execution Module
///
/// This module executes read statements with optional pagination, runs
/// free-text DDL/DML verbatim, and derives total-row counts for paginated
/// browsing. Statement classification and count derivation are text-based
/// on purpose: this tool runs what the operator typed, it does not parse
/// it.
use crate::core::{Result, ScoutError};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{types::ValueRef, Connection};

/// A single result cell, mirroring SQLite's native column affinities.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    fn from_sql(value: ValueRef) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }

    /// Formats the value for terminal display.
    pub fn display(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(t) => t.clone(),
            Value::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
        }
    }
}

/// Represents the result of a row-returning statement.
///
/// Column names are unique within a result and come from the statement
/// metadata in result order. A result set is produced fresh per query and
/// never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    /// Column names from the query result
    pub columns: Vec<String>,
    /// Rows of data, each cell in column order
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of executing a free-form statement.
#[derive(Debug, PartialEq)]
pub enum QueryOutcome {
    /// A select-like statement produced rows (possibly zero)
    Rows(ResultSet),
    /// A non-select statement ran without producing rows
    Executed { rows_affected: usize },
}

/// Pagination window appended to select-like statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Page { limit, offset }
    }

    /// Builds the window for a 1-based page number.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Validation` for page 0.
    pub fn number(page: u64, page_size: u64) -> Result<Self> {
        if page == 0 {
            return Err(ScoutError::Validation(
                "page numbers start at 1".to_string(),
            ));
        }
        Ok(Page {
            limit: page_size,
            offset: (page - 1) * page_size,
        })
    }
}

/// Statement keywords that are expected to return rows and are therefore
/// eligible for pagination.
const READ_KEYWORDS: [&str; 5] = ["SELECT", "VALUES", "WITH", "PRAGMA", "EXPLAIN"];

/// Classifies a statement as select-like by its leading keyword.
pub fn is_select_like(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    READ_KEYWORDS.iter().any(|keyword| {
        trimmed
            .get(..keyword.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(keyword))
            && trimmed[keyword.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric() && c != '_')
    })
}

/// Executes a free-form SQL statement.
///
/// Select-like statements return a `ResultSet`; when a page is supplied
/// its window is appended as a literal `LIMIT n OFFSET m` suffix. All
/// other statements run verbatim with no pagination. This is the path
/// for raw DDL/DML typed by an operator into a free-form query box, and
/// executing it unmodified is an intentional capability of the tool.
///
/// # Arguments
///
/// * `conn` - Database connection to execute the statement on
/// * `sql` - The SQL statement to execute
/// * `page` - Optional pagination window for select-like statements
///
/// # Errors
///
/// Returns `ScoutError::Query` if the statement fails to prepare or
/// execute.
pub fn execute(conn: &Connection, sql: &str, page: Option<Page>) -> Result<QueryOutcome> {
    if !is_select_like(sql) {
        let rows_affected = conn
            .execute(sql, [])
            .map_err(|e| ScoutError::Query(format!("statement execution failed: {}", e)))?;
        return Ok(QueryOutcome::Executed { rows_affected });
    }

    let paged_sql;
    let effective_sql = match page {
        Some(page) => {
            paged_sql = format!(
                "{} LIMIT {} OFFSET {}",
                sql.trim_end().trim_end_matches(';').trim_end(),
                page.limit,
                page.offset
            );
            paged_sql.as_str()
        }
        None => sql,
    };

    let mut stmt = conn
        .prepare(effective_sql)
        .map_err(|e| ScoutError::Query(format!("failed to prepare statement: {}", e)))?;

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = stmt.column_count();

    let rows = stmt
        .query_map([], |row| {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                cells.push(Value::from_sql(row.get_ref(i)?));
            }
            Ok(cells)
        })
        .map_err(|e| ScoutError::Query(format!("query execution failed: {}", e)))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ScoutError::Query(format!("result processing failed: {}", e)))?;

    Ok(QueryOutcome::Rows(ResultSet { columns, rows }))
}

// Trailing LIMIT n / LIMIT m,n / LIMIT n OFFSET m, optionally followed by
// a statement terminator.
static LIMIT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+LIMIT\s+\d+(\s*,\s*\d+|\s+OFFSET\s+\d+)?\s*$").unwrap()
});

// Trailing ORDER BY clause. The character class stops at parentheses so a
// subquery's closing paren is never swallowed.
static ORDER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+ORDER\s+BY\s+[^()]+$").unwrap());

/// Derives the counting statement for a select-like query.
///
/// The transform strips one trailing `LIMIT` clause (with optional
/// `OFFSET`) and one trailing `ORDER BY` clause, then wraps the remainder
/// as `SELECT COUNT(*) FROM (...) AS _t`. Stripping keeps the count
/// independent of any pagination already present in the input; wrapping
/// counts arbitrary statements without guessing at their structure.
///
/// The stripping is a heuristic text transform, applied once with no
/// recursion into subqueries: statements whose string literals contain
/// `ORDER BY`-looking text at the very end may be mis-transformed.
pub fn count_statement(sql: &str) -> String {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    let without_limit = LIMIT_SUFFIX.replace(trimmed, "");
    let without_order = ORDER_SUFFIX.replace(&without_limit, "");
    format!("SELECT COUNT(*) FROM ({}) AS _t", without_order)
}

/// Executes the derived counting statement and returns the total row
/// count of `sql` ignoring any pagination suffix it carries.
///
/// # Errors
///
/// Returns `ScoutError::Query` if the derived statement fails, which can
/// happen for statements the heuristic transform mis-handles.
pub fn count_total(conn: &Connection, sql: &str) -> Result<u64> {
    let count_sql = count_statement(sql);
    let count: i64 = conn
        .query_row(&count_sql, [], |row| row.get(0))
        .map_err(|e| ScoutError::Query(format!("count derivation failed: {}", e)))?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_test_table(conn: &Connection) {
        conn.execute_batch(
            "
            CREATE TABLE test (
                id INTEGER PRIMARY KEY,
                name TEXT,
                value REAL
            );
            INSERT INTO test (name, value) VALUES ('Alice', 123.45);
            INSERT INTO test (name, value) VALUES ('Bob', 678.90);
            INSERT INTO test (name, value) VALUES (NULL, NULL);
            INSERT INTO test (name, value) VALUES ('Cara', 1.5);
            INSERT INTO test (name, value) VALUES ('Dan', 2.5);
        ",
        )
        .unwrap();
    }

    #[test]
    fn test_select_like_classification() {
        assert!(is_select_like("SELECT * FROM users"));
        assert!(is_select_like("  select 1"));
        assert!(is_select_like("WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(is_select_like("VALUES (1), (2)"));
        assert!(is_select_like("PRAGMA table_info(users)"));
        assert!(is_select_like("EXPLAIN SELECT 1"));

        assert!(!is_select_like("INSERT INTO users VALUES (1)"));
        assert!(!is_select_like("UPDATE users SET name = 'x'"));
        assert!(!is_select_like("DROP TABLE users"));
        // Keyword must stand alone, not prefix an identifier
        assert!(!is_select_like("SELECTION_LOG"));
    }

    #[test]
    fn test_execute_select() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let outcome = execute(&conn, "SELECT * FROM test ORDER BY id", None).unwrap();
        let result = match outcome {
            QueryOutcome::Rows(result) => result,
            other => panic!("Expected rows, got {:?}", other),
        };

        assert_eq!(result.columns, vec!["id", "name", "value"]);
        assert_eq!(result.row_count(), 5);
        assert_eq!(
            result.rows[0],
            vec![
                Value::Integer(1),
                Value::Text("Alice".to_string()),
                Value::Real(123.45)
            ]
        );
        // NULL handling
        assert_eq!(result.rows[2][1], Value::Null);
    }

    #[test]
    fn test_execute_paginated() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let page = Page::number(2, 2).unwrap();
        assert_eq!(page, Page::new(2, 2));

        let outcome = execute(&conn, "SELECT id FROM test ORDER BY id;", Some(page)).unwrap();
        match outcome {
            QueryOutcome::Rows(result) => {
                assert_eq!(result.rows.len(), 2);
                assert_eq!(result.rows[0][0], Value::Integer(3));
                assert_eq!(result.rows[1][0], Value::Integer(4));
            }
            other => panic!("Expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_page_number_validation() {
        assert!(Page::number(0, 10).is_err());
        assert_eq!(Page::number(1, 10).unwrap(), Page::new(10, 0));
        assert_eq!(Page::number(3, 25).unwrap(), Page::new(25, 50));
    }

    #[test]
    fn test_execute_non_select() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let outcome = execute(&conn, "UPDATE test SET value = 0 WHERE id <= 2", None).unwrap();
        assert_eq!(outcome, QueryOutcome::Executed { rows_affected: 2 });

        // Pagination is never appended to non-select statements.
        let outcome = execute(
            &conn,
            "DELETE FROM test WHERE id = 5",
            Some(Page::new(1, 0)),
        )
        .unwrap();
        assert_eq!(outcome, QueryOutcome::Executed { rows_affected: 1 });
    }

    #[test]
    fn test_query_error_handling() {
        let conn = Connection::open_in_memory().unwrap();

        let result = execute(&conn, "SELECT * FROM nonexistent_table", None);
        match result.unwrap_err() {
            ScoutError::Query(msg) => assert!(msg.contains("no such table")),
            other => panic!("Expected Query error, got {:?}", other),
        }
    }

    #[test]
    fn test_blob_cells() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE blobs (id INTEGER, data BLOB)", [])
            .unwrap();
        conn.execute("INSERT INTO blobs VALUES (1, X'48656C6C6F')", [])
            .unwrap();

        let outcome = execute(&conn, "SELECT data FROM blobs", None).unwrap();
        match outcome {
            QueryOutcome::Rows(result) => {
                assert_eq!(result.rows[0][0], Value::Blob(b"Hello".to_vec()));
                assert_eq!(result.rows[0][0].display(), "<BLOB: 5 bytes>");
            }
            other => panic!("Expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_count_statement_transform() {
        assert_eq!(
            count_statement("SELECT * FROM t"),
            "SELECT COUNT(*) FROM (SELECT * FROM t) AS _t"
        );
        assert_eq!(
            count_statement("SELECT * FROM t LIMIT 5"),
            "SELECT COUNT(*) FROM (SELECT * FROM t) AS _t"
        );
        assert_eq!(
            count_statement("SELECT * FROM t ORDER BY x LIMIT 5 OFFSET 10;"),
            "SELECT COUNT(*) FROM (SELECT * FROM t) AS _t"
        );
        assert_eq!(
            count_statement("SELECT * FROM t order by x desc, y"),
            "SELECT COUNT(*) FROM (SELECT * FROM t) AS _t"
        );
        assert_eq!(
            count_statement("SELECT * FROM t LIMIT 10, 20"),
            "SELECT COUNT(*) FROM (SELECT * FROM t) AS _t"
        );
        // A subquery's ORDER BY is out of reach of the trailing transform
        assert_eq!(
            count_statement("SELECT * FROM (SELECT * FROM t ORDER BY x)"),
            "SELECT COUNT(*) FROM (SELECT * FROM (SELECT * FROM t ORDER BY x)) AS _t"
        );
    }

    #[test]
    fn test_count_total_matches_unpaginated_row_count() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        assert_eq!(count_total(&conn, "SELECT * FROM test").unwrap(), 5);
        // Pagination in the input never changes the count.
        assert_eq!(
            count_total(&conn, "SELECT * FROM test ORDER BY name LIMIT 2").unwrap(),
            5
        );
        assert_eq!(
            count_total(&conn, "SELECT * FROM test LIMIT 1 OFFSET 4").unwrap(),
            5
        );
        // Filters still apply.
        assert_eq!(
            count_total(&conn, "SELECT * FROM test WHERE value > 100 LIMIT 1").unwrap(),
            2
        );
    }
}
