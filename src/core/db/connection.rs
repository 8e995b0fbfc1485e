/// Connection Management Module
///
/// This module opens database files for the browser core: it validates the
/// path, detects whether the file is a plaintext SQLite database, and for
/// encrypted files negotiates a working `PRAGMA key` format against a
/// fixed candidate table, memoizing the winning command in an injected
/// per-user cache.
use crate::core::{Result, ScoutError};
use rusqlite::Connection;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::{Component, Path};
use tracing::debug;

/// Leading bytes of an unencrypted SQLite database file.
const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Pragmas applied after every successful open. Fixed values, never
/// per-call configurable: relaxed durability, a 64 MiB page cache, and
/// in-memory temp storage.
const OPEN_PRAGMAS: &str = "
    PRAGMA synchronous = OFF;
    PRAGMA cache_size = -64000;
    PRAGMA temp_store = MEMORY;
";

/// Per-user memo of which key-establishment command unlocked which file.
///
/// The store itself belongs to the session collaborator; the connection
/// manager only needs get/set/invalidate by key. An entry is trusted until
/// it fails a canary check, at which point it is invalidated before any
/// fallback attempt.
pub trait KeyFormatCache {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, command: String);
    fn invalidate(&mut self, key: &str);
}

/// Cache that remembers nothing. Every encrypted open pays the full
/// candidate trial; useful for one-shot callers without a session.
#[derive(Debug, Default)]
pub struct NoopCache;

impl KeyFormatCache for NoopCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&mut self, _key: &str, _command: String) {}

    fn invalidate(&mut self, _key: &str) {}
}

/// Passphrase encodings understood by the encryption layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyEncoding {
    /// Passphrase passed as literal text
    Literal,
    /// Passphrase hex-encoded and passed as raw key bytes
    Hex,
}

/// Candidate key-establishment formats in trial order: each encoding with
/// and without a trailing statement terminator. The first candidate that
/// passes the canary check wins and is memoized verbatim.
const KEY_CANDIDATES: [(KeyEncoding, bool); 4] = [
    (KeyEncoding::Literal, false),
    (KeyEncoding::Literal, true),
    (KeyEncoding::Hex, false),
    (KeyEncoding::Hex, true),
];

/// Builds the establishment command for one candidate format.
fn key_command(passphrase: &str, encoding: KeyEncoding, terminated: bool) -> String {
    let mut command = match encoding {
        KeyEncoding::Literal => {
            format!("PRAGMA key = '{}'", passphrase.replace('\'', "''"))
        }
        KeyEncoding::Hex => {
            format!("PRAGMA key = \"x'{}'\"", hex::encode(passphrase.as_bytes()))
        }
    };
    if terminated {
        command.push(';');
    }
    command
}

/// Derives the cache key for a (path, passphrase) pair.
pub fn cache_key(path: &str, passphrase: &str) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    passphrase.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// An open database handle.
///
/// Handles are created per logical operation and released afterward; there
/// is no pooling and a handle must never be shared across concurrent
/// operations.
#[derive(Debug)]
pub struct DbHandle {
    connection: Option<Connection>,
    path: String,
}

impl DbHandle {
    fn new(connection: Connection, path: &str) -> Self {
        DbHandle {
            connection: Some(connection),
            path: path.to_string(),
        }
    }

    /// Returns the underlying connection.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Connection` if the handle has been closed.
    pub fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| ScoutError::Connection("connection is closed".to_string()))
    }

    /// Path of the database file this handle was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Releases the connection. Safe to call multiple times; a no-op once
    /// the handle is already closed.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
            debug!(path = %self.path, "closed database connection");
        }
    }
}

/// Opens database files, negotiating the encryption key format when a
/// passphrase is supplied. The key-format cache is injected so its storage
/// and lifetime stay with the session collaborator.
pub struct ConnectionManager<'a> {
    cache: &'a mut dyn KeyFormatCache,
}

impl<'a> ConnectionManager<'a> {
    pub fn new(cache: &'a mut dyn KeyFormatCache) -> Self {
        ConnectionManager { cache }
    }

    /// Opens the database file at `path`, establishing the encryption key
    /// when a passphrase is given.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to an existing database file. Paths containing
    ///   parent-directory segments are rejected before any file access.
    /// * `passphrase` - Optional encryption passphrase.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::File` for missing/unreadable/too-small files
    /// and traversal paths, `ScoutError::Connection` when the file appears
    /// encrypted and no passphrase was given, or when no candidate key
    /// format unlocks it.
    pub fn open(&mut self, path: &str, passphrase: Option<&str>) -> Result<DbHandle> {
        validate_path(path)?;

        // A plaintext magic header wins over any supplied passphrase.
        if has_plaintext_magic(path)? {
            return open_plain(path);
        }

        match passphrase {
            None => Err(ScoutError::Connection(format!(
                "{} appears encrypted, passphrase required",
                path
            ))),
            Some(pass) => self.open_encrypted(path, pass),
        }
    }

    fn open_encrypted(&mut self, path: &str, passphrase: &str) -> Result<DbHandle> {
        let key = cache_key(path, passphrase);

        if let Some(command) = self.cache.get(&key) {
            if let Some(connection) = try_key_command(path, &command) {
                debug!(path, "unlocked with cached key format");
                apply_pragmas(&connection)?;
                return Ok(DbHandle::new(connection, path));
            }
            // Stale entry: invalidate before falling back to the trial.
            debug!(path, "cached key format failed canary check, invalidating");
            self.cache.invalidate(&key);
        }

        for (encoding, terminated) in KEY_CANDIDATES {
            let command = key_command(passphrase, encoding, terminated);
            if let Some(connection) = try_key_command(path, &command) {
                debug!(path, ?encoding, terminated, "key format accepted");
                self.cache.set(&key, command);
                apply_pragmas(&connection)?;
                return Ok(DbHandle::new(connection, path));
            }
        }

        Err(ScoutError::Connection(
            "invalid encryption key or unsupported format".to_string(),
        ))
    }
}

fn open_plain(path: &str) -> Result<DbHandle> {
    let connection = Connection::open(path).map_err(ScoutError::Database)?;
    apply_pragmas(&connection)?;
    Ok(DbHandle::new(connection, path))
}

/// Applies one establishment command to a fresh connection and canary-tests
/// it. A connection that saw a failed key is discarded rather than reused.
fn try_key_command(path: &str, command: &str) -> Option<Connection> {
    let connection = Connection::open(path).ok()?;
    if connection.execute_batch(command).is_err() {
        return None;
    }
    if !canary(&connection) {
        return None;
    }
    Some(connection)
}

/// Minimal side-effect-free read proving the key actually unlocked the
/// file. Key pragmas report success unconditionally; only a real read
/// against the internal catalog tells the truth.
fn canary(connection: &Connection) -> bool {
    connection
        .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .is_ok()
}

fn apply_pragmas(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(OPEN_PRAGMAS)
        .map_err(ScoutError::Database)
}

/// Validates that `path` refers to an existing regular file large enough
/// to carry a database header, and carries no parent-directory segments.
fn validate_path(path: &str) -> Result<()> {
    if Path::new(path)
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(ScoutError::File(format!(
            "path contains parent-directory segments: {}",
            path
        )));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| ScoutError::File(format!("cannot read {}: {}", path, e)))?;
    if !metadata.is_file() {
        return Err(ScoutError::File(format!("not a regular file: {}", path)));
    }
    if metadata.len() < SQLITE_MAGIC.len() as u64 {
        return Err(ScoutError::File(format!(
            "too small to be a database file: {}",
            path
        )));
    }
    Ok(())
}

/// Reads the leading 16 bytes and compares them against the standard
/// unencrypted-file magic header.
fn has_plaintext_magic(path: &str) -> Result<bool> {
    let mut header = [0u8; 16];
    let mut file =
        std::fs::File::open(path).map_err(|e| ScoutError::File(format!("cannot open {}: {}", path, e)))?;
    file.read_exact(&mut header)
        .map_err(|e| ScoutError::File(format!("cannot read header of {}: {}", path, e)))?;
    Ok(&header == SQLITE_MAGIC)
}
