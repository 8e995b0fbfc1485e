//! Per-user session state for the browser collaborators: the key-format
//! cache consumed by the connection manager, a bounded history of executed
//! raw statements, favorited statements, and the last-selected database.
//! The transport (cookies, server-side store) belongs to the collaborator;
//! this is the in-memory shape it persists.
use crate::core::db::connection::KeyFormatCache;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Maximum number of raw statements retained in history; the oldest entry
/// is evicted first once the cap is reached.
pub const HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Default)]
pub struct Session {
    key_formats: HashMap<String, String>,
    history: VecDeque<String>,
    favorites: Vec<String>,
    last_database: Option<String>,
    passphrase: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Records a raw statement in history. Consecutive duplicates are
    /// collapsed; the oldest entry is evicted beyond the cap.
    pub fn record_statement(&mut self, sql: &str) {
        if self.history.back().map(String::as_str) == Some(sql) {
            return;
        }
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(sql.to_string());
    }

    /// Executed statements, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn add_favorite(&mut self, sql: &str) {
        if !self.favorites.iter().any(|fav| fav == sql) {
            self.favorites.push(sql.to_string());
        }
    }

    pub fn remove_favorite(&mut self, sql: &str) {
        self.favorites.retain(|fav| fav != sql);
    }

    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    pub fn set_last_database(&mut self, name: &str) {
        self.last_database = Some(name.to_string());
    }

    pub fn last_database(&self) -> Option<&str> {
        self.last_database.as_deref()
    }

    pub fn set_passphrase(&mut self, passphrase: &str) {
        self.passphrase = Some(passphrase.to_string());
    }

    pub fn clear_passphrase(&mut self) {
        self.passphrase = None;
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }
}

impl KeyFormatCache for Session {
    fn get(&self, key: &str) -> Option<String> {
        self.key_formats.get(key).cloned()
    }

    fn set(&mut self, key: &str, command: String) {
        self.key_formats.insert(key.to_string(), command);
    }

    fn invalidate(&mut self, key: &str) {
        if self.key_formats.remove(key).is_some() {
            debug!(key, "invalidated key-format cache entry");
        }
    }
}
