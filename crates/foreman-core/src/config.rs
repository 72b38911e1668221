//! Storage configuration, loaded from a TOML file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a foreman deployment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub store: StoreConfig,
}

/// Settings for the SQLite entity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the store database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds for store connections.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("foreman.sqlite3")
}

const fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Load configuration from `<root>/foreman.toml`, falling back to defaults
/// when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(root: &Path) -> Result<CoreConfig> {
    let path = root.join("foreman.toml");
    if !path.exists() {
        return Ok(CoreConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, load_config};
    use std::path::PathBuf;

    #[test]
    fn defaults_are_stable() {
        let config = CoreConfig::default();
        assert_eq!(config.store.path, PathBuf::from("foreman.sqlite3"));
        assert_eq!(config.store.busy_timeout_ms, 5000);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(dir.path()).expect("load defaults");
        assert_eq!(config.store.busy_timeout_ms, 5000);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("foreman.toml"),
            "[store]\npath = \"data/tracker.sqlite3\"\n",
        )
        .expect("write config");

        let config = load_config(dir.path()).expect("load config");
        assert_eq!(config.store.path, PathBuf::from("data/tracker.sqlite3"));
        assert_eq!(config.store.busy_timeout_ms, 5000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("foreman.toml"), "store = 12").expect("write config");
        assert!(load_config(dir.path()).is_err());
    }
}
