//! Configuration types for the gateway.
//!
//! Contains the root `GatewayConfig` struct and its sections. All fields have
//! defaults, so an empty file (or no file at all) yields a working setup.

use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::constants::{
    DEFAULT_COMMAND_CHANNEL, DEFAULT_INSTANCE_NAME, DEFAULT_SCHEME, config,
};

/// Root configuration structure for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Custom URI scheme handled by the application (e.g. `secrandom`).
    ///
    /// Matched case-sensitively against incoming URLs.
    pub scheme: String,

    /// Name the single-instance token and the activation address are derived from.
    pub instance_name: String,

    /// Address name of the JSON command channel.
    pub command_channel: String,

    /// Register the URL scheme with the OS when the primary instance starts.
    ///
    /// Disabled by default; the `protocol register` command registers on demand.
    pub register_protocol: bool,

    /// Credential verification for side-effecting commands.
    pub security: SecurityConfig,

    /// Optional bridge to an external scheduling application.
    pub bridge: BridgeConfig,

    /// Directory for persisted gateway state (endpoint record).
    ///
    /// Defaults to the user's local data directory.
    pub state_dir: Option<PathBuf>,

    /// Directory for the instance lock and socket files.
    ///
    /// Defaults to the user's runtime directory, falling back to the cache
    /// directory and finally the system temp directory.
    pub runtime_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            command_channel: DEFAULT_COMMAND_CHANNEL.to_string(),
            register_protocol: false,
            security: SecurityConfig::default(),
            bridge: BridgeConfig::default(),
            state_dir: None,
            runtime_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Checks that names and the scheme are usable before anything binds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_scheme(&self.scheme) {
            return Err(ConfigError::Invalid(format!(
                "scheme '{}' must start with a letter and contain only letters, digits, '+', '-' or '.'",
                self.scheme
            )));
        }

        for (field, value) in [
            ("instanceName", &self.instance_name),
            ("commandChannel", &self.command_channel),
        ] {
            if !is_valid_name(value) {
                return Err(ConfigError::Invalid(format!(
                    "{field} '{value}' must be non-empty and must not contain path separators"
                )));
            }
        }

        if self.security.credential.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid(
                "security.credential must not be empty when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Directory for persisted state such as the endpoint record.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(config::APP_DIR)
        })
    }

    /// Directory for the instance lock and filesystem socket names.
    #[must_use]
    pub fn runtime_dir(&self) -> PathBuf {
        self.runtime_dir.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .or_else(dirs::cache_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(config::APP_DIR)
        })
    }
}

/// Credential verification settings.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret a command must carry in `payload.verification`.
    ///
    /// When unset, every command is accepted.
    pub credential: Option<String>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Scheduling bridge settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BridgeConfig {
    /// Local socket name of the external scheduling application, resolved
    /// like the gateway's own channels (a socket file in the runtime
    /// directory on Unix, a named pipe on Windows).
    ///
    /// When unset or unreachable at startup, the bridge is disabled.
    pub endpoint: Option<String>,
}

/// Returns whether `scheme` is a syntactically valid URI scheme.
#[must_use]
pub fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Returns whether `name` can be used for a lock file or socket name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\', '\0'])
}
