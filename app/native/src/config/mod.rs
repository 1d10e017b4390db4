//! Configuration loading for the gateway.
//!
//! The configuration file is JSONC (JSON with comments) and is optional: when
//! no file is found the defaults from [`GatewayConfig::default`] apply.

mod types;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
pub use types::{BridgeConfig, GatewayConfig, SecurityConfig, is_valid_name, is_valid_scheme};

use crate::core::constants::config::{APP_DIR, CONFIG_FILE_NAMES};

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but holds unusable values.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/secrandom/gateway.jsonc` when the variable is set
/// 2. The platform config directory (`~/.config`, `%APPDATA%`, `~/Library/Application Support`)
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let app_dir = PathBuf::from(xdg_config).join(APP_DIR);
        for filename in CONFIG_FILE_NAMES {
            paths.push(app_dir.join(filename));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join(APP_DIR);
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    paths
}

/// Loads and validates the configuration from a specific file path.
///
/// Both single-line (`//`) and multi-line (`/* */`) comments are stripped
/// before parsing.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, `Io`/`Parse`
/// if it cannot be read or parsed, and `Invalid` if validation fails.
pub fn load_config_from_path(path: &Path) -> Result<GatewayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: GatewayConfig = serde_json::from_reader(reader)?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Loads the configuration.
///
/// An explicit path must exist. Without one, the first existing file from
/// [`config_paths`] is used, and defaults apply when there is none.
///
/// # Errors
///
/// Returns an error if a configuration file exists but is unreadable or invalid,
/// or if the explicit path does not exist.
pub fn load_config(explicit: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config_from_path(path);
    }

    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    tracing::debug!("no configuration file found, using defaults");
    Ok(GatewayConfig::default())
}

/// Generates the JSON Schema of [`GatewayConfig`].
#[must_use]
pub fn schema_json() -> String {
    let schema = schemars::schema_for!(GatewayConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_config_strips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.jsonc");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{
                // custom scheme
                "scheme": "classroom", /* inline */
                "registerProtocol": true
            }}"#
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.scheme, "classroom");
        assert!(config.register_protocol);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jsonc");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        fs::write(&path, r#"{"scheme": "bad scheme"}"#).unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = schema_json();
        assert!(schema.contains("instanceName"));
        assert!(schema.contains("registerProtocol"));
    }
}
