/// sqlscout Error Module
///
/// This module defines the error types for the browser core. Every core
/// operation returns an explicit success value or one of these typed
/// errors; no operation swallows a failure into an empty success.
use thiserror::Error;

/// Error type covering all failure classes of the browser core:
/// - File access (missing/unreadable/invalid database paths)
/// - Connection establishment (including encryption-key negotiation)
/// - Schema introspection (unknown tables/columns)
/// - Query preparation and execution
/// - Mutations that require a primary key on tables without one
/// - Validation of caller-supplied field sets and export input
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Missing, unreadable, or structurally invalid database file paths
    #[error("File error: {0}")]
    File(String),

    /// Connection open or encryption-key establishment failures
    #[error("Connection error: {0}")]
    Connection(String),

    /// Unknown tables/columns and other introspection failures
    #[error("Schema error: {0}")]
    Schema(String),

    /// Prepare/execute failures on invalid statements
    #[error("Query error: {0}")]
    Query(String),

    /// Mutations requiring a primary key on a table without one
    #[error("Constraint error: {0}")]
    Constraint(String),

    /// Empty insert/update field sets, empty export sets, bad pagination
    #[error("Validation error: {0}")]
    Validation(String),

    /// Underlying SQLite driver errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors from the export path
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result to use ScoutError as the error type.
///
/// This provides a consistent error type across the entire crate
/// instead of using `Result<T, String>` or mixed error types.
pub type Result<T> = std::result::Result<T, ScoutError>;
