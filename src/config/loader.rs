//! Configuration file loading and parsing.

use std::path::Path;

use anyhow::{Context, Result};

use super::model::AppConfig;
use super::validate::{format_report, validate_config};
use crate::error::ConfigError;

/// Loads the configuration file from disk and parses it.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    // An empty file parses as null; treat it as an empty mapping.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    let config: AppConfig =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(config)
}

/// Loads the configuration file, or the defaults when no file is given.
///
/// Validation is left to [`ensure_valid`], so its warnings can be logged
/// once logging is set up from the loaded configuration.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_from_path(path).context("Failed to load configuration"),
        None => Ok(AppConfig::default()),
    }
}

/// Logs suspicious values and rejects a configuration with invalid ones.
pub fn ensure_valid(config: &AppConfig) -> Result<()> {
    let issues = validate_config(config);

    for issue in issues.iter().filter(|i| !i.is_fatal()) {
        tracing::warn!(field = issue.field(), "{}", issue);
    }

    let error_count = issues.iter().filter(|i| i.is_fatal()).count();
    if error_count > 0 {
        tracing::error!("{}", format_report(&issues));
        anyhow::bail!(ConfigError::ValidationFailed { error_count });
    }

    Ok(())
}
