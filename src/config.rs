use crate::core::{Result, ScoutError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default number of rows per browse page when the configuration does not
/// say otherwise.
pub const DEFAULT_PAGE_SIZE: u64 = 30;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub browser: BrowserConfig,
    pub session: Option<SessionConfig>,
}

/// Browsing policy defaults the UI collaborator passes into the core.
#[derive(Debug, Deserialize)]
pub struct BrowserConfig {
    pub page_size: Option<u64>,
    pub default_export: Option<String>,
}

impl BrowserConfig {
    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Session retention knobs owned by the collaborator.
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    pub remember_passphrase: Option<bool>,
    pub remember_last_database: Option<bool>,
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| ScoutError::Config(e.to_string()))?;
    toml::from_str(&content).map_err(|e| ScoutError::Config(e.to_string()))
}
