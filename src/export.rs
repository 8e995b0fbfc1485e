/// Export Module
///
/// Serializes a query result into a downloadable byte stream. An empty
/// result is refused rather than silently emitted as an empty file.
use crate::core::db::query::{ResultSet, Value};
use crate::core::db::schema::quote_identifier;
use crate::core::{Result, ScoutError};
use serde_json::json;

/// Target format for a serialized result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    /// SQL INSERT statements against the named target table, threaded
    /// through from the originating query.
    Sql { table: String },
}

/// Serializes `result` into the requested format.
///
/// # Errors
///
/// Returns `ScoutError::Validation` ("no data to export") when the row
/// sequence is empty.
pub fn serialize(result: &ResultSet, format: &ExportFormat) -> Result<Vec<u8>> {
    if result.is_empty() {
        return Err(ScoutError::Validation("no data to export".to_string()));
    }

    match format {
        ExportFormat::Csv => Ok(to_csv(result).into_bytes()),
        ExportFormat::Json => Ok(to_json(result)?.into_bytes()),
        ExportFormat::Sql { table } => Ok(to_sql(result, table).into_bytes()),
    }
}

/// Quotes a CSV field when it contains the delimiter, the quote
/// character, or a line break; embedded quotes are doubled.
fn csv_field(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') || text.contains('\r') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Blob(bytes) => hex::encode(bytes),
        Value::Text(text) => text.clone(),
        other => other.display(),
    }
}

fn to_csv(result: &ResultSet) -> String {
    let mut output = String::new();
    let header: Vec<String> = result.columns.iter().map(|c| csv_field(c)).collect();
    output.push_str(&header.join(","));
    output.push('\n');

    for row in &result.rows {
        let fields: Vec<String> = row.iter().map(|cell| csv_field(&csv_cell(cell))).collect();
        output.push_str(&fields.join(","));
        output.push('\n');
    }
    output
}

fn json_cell(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => json!(i),
        Value::Real(f) => json!(f),
        Value::Text(t) => json!(t),
        Value::Blob(b) => json!(hex::encode(b)),
    }
}

fn to_json(result: &ResultSet) -> Result<String> {
    let rows: Vec<serde_json::Value> = result
        .rows
        .iter()
        .map(|row| {
            let object: serde_json::Map<String, serde_json::Value> = result
                .columns
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.clone(), json_cell(cell)))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();

    let document = json!({
        "columns": result.columns,
        "rows": rows,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Renders one value as a SQL literal: NULL as the bareword, blobs as hex
/// literals, everything else single-quoted with quotes and backslashes
/// escaped.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Blob(bytes) => format!("X'{}'", hex::encode(bytes)),
        other => format!(
            "'{}'",
            other.display().replace('\\', "\\\\").replace('\'', "''")
        ),
    }
}

fn to_sql(result: &ResultSet, table: &str) -> String {
    let column_list = result
        .columns
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut output = String::new();
    for row in &result.rows {
        let values: Vec<String> = row.iter().map(sql_literal).collect();
        output.push_str(&format!(
            "INSERT INTO {} ({}) VALUES ({});\n",
            quote_identifier(table),
            column_list,
            values.join(", ")
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> ResultSet {
        ResultSet {
            columns: vec!["id".to_string(), "name".to_string(), "note".to_string()],
            rows: vec![
                vec![
                    Value::Integer(1),
                    Value::Text("Alice".to_string()),
                    Value::Null,
                ],
                vec![
                    Value::Integer(2),
                    Value::Text("Bob, \"the builder\"".to_string()),
                    Value::Text("line1\nline2".to_string()),
                ],
            ],
        }
    }

    #[test]
    fn test_empty_result_is_refused() {
        let empty = ResultSet {
            columns: vec!["id".to_string()],
            rows: vec![],
        };
        for format in [
            ExportFormat::Csv,
            ExportFormat::Json,
            ExportFormat::Sql {
                table: "t".to_string(),
            },
        ] {
            let result = serialize(&empty, &format);
            match result.unwrap_err() {
                ScoutError::Validation(msg) => assert_eq!(msg, "no data to export"),
                other => panic!("Expected Validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_csv_quoting() {
        let bytes = serialize(&sample_result(), &ExportFormat::Csv).unwrap();
        let csv = String::from_utf8(bytes).unwrap();
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("id,name,note"));
        assert_eq!(lines.next(), Some("1,Alice,"));
        // Field with delimiter and quotes is quoted with quotes doubled;
        // the embedded newline keeps the record on two physical lines.
        assert_eq!(
            lines.next(),
            Some("2,\"Bob, \"\"the builder\"\"\",\"line1")
        );
        assert_eq!(lines.next(), Some("line2\""));
    }

    #[test]
    fn test_json_document_shape() {
        let bytes = serialize(&sample_result(), &ExportFormat::Json).unwrap();
        let document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(document["columns"][1], "name");
        assert_eq!(document["rows"][0]["id"], 1);
        assert_eq!(document["rows"][0]["name"], "Alice");
        assert!(document["rows"][0]["note"].is_null());
        // Pretty-printed, not a single line.
        assert!(bytes.iter().filter(|&&b| b == b'\n').count() > 3);
    }

    #[test]
    fn test_sql_insert_lines() {
        let format = ExportFormat::Sql {
            table: "people".to_string(),
        };
        let bytes = serialize(&sample_result(), &format).unwrap();
        let sql = String::from_utf8(bytes).unwrap();

        assert!(sql.starts_with(
            "INSERT INTO \"people\" (\"id\", \"name\", \"note\") VALUES ('1', 'Alice', NULL);\n"
        ));
        // Embedded quotes doubled in the literal.
        assert!(sql.contains("'Bob, \"the builder\"'"));
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(sql_literal(&Value::Null), "NULL");
        assert_eq!(sql_literal(&Value::Integer(7)), "'7'");
        assert_eq!(sql_literal(&Value::Text("it's".to_string())), "'it''s'");
        assert_eq!(
            sql_literal(&Value::Text("back\\slash".to_string())),
            "'back\\\\slash'"
        );
        assert_eq!(sql_literal(&Value::Blob(vec![0xAB, 0xCD])), "X'abcd'");
    }

    #[test]
    fn test_blob_cells_render_as_hex() {
        let result = ResultSet {
            columns: vec!["data".to_string()],
            rows: vec![vec![Value::Blob(b"Hi".to_vec())]],
        };

        let csv = String::from_utf8(serialize(&result, &ExportFormat::Csv).unwrap()).unwrap();
        assert!(csv.contains("4869"));

        let json = String::from_utf8(serialize(&result, &ExportFormat::Json).unwrap()).unwrap();
        assert!(json.contains("4869"));
    }
}
