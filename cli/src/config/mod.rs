//! Configuration management for patissuer.
//!
//! Settings are layered: command-line flags and `PATISSUER_*` environment
//! variables (applied by the CLI) override the config file, which overrides
//! built-in defaults.

pub mod paths;
pub mod settings;

pub use settings::{CredentialsConfig, PatissuerConfig};

use std::path::Path;

use crate::error::{PatissuerError, Result};

/// Load configuration.
///
/// An explicit `path` must exist. Otherwise the first existing file of
/// [`paths::default_config_files`] is used, falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<PatissuerConfig> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(PatissuerError::ConfigRead(format!(
                "{} does not exist",
                path.display()
            )));
        }
        return load_config_from(path);
    }

    match paths::default_config_files().iter().find(|p| p.exists()) {
        Some(path) => load_config_from(path),
        None => Ok(PatissuerConfig::default()),
    }
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns default configuration.
pub fn load_config_from(path: &Path) -> Result<PatissuerConfig> {
    if !path.exists() {
        return Ok(PatissuerConfig::default());
    }

    tracing::info!("Using config file: {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    let config: PatissuerConfig = toml::from_str(&contents)?;

    Ok(config)
}
