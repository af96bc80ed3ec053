//! Platform-specific path utilities for patissuer.

use std::path::PathBuf;

use crate::error::{PatissuerError, Result};

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "patissuer.toml";

/// Get the configuration directory for patissuer.
///
/// - Linux: `~/.config/patissuer`
/// - macOS: `~/Library/Application Support/patissuer`
/// - Windows: `%APPDATA%\patissuer`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| PatissuerError::Config("Cannot determine config directory".to_string()))?;
    Ok(base.join("patissuer"))
}

/// Get the user-wide configuration file path.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Config files in lookup order: working directory first, then user-wide.
pub fn default_config_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    match config_file() {
        Ok(path) => files.push(path),
        Err(e) => tracing::debug!("skipping user config file: {e}"),
    }
    files
}
