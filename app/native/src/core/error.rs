//! Unified error types for the gateway.
//!
//! This module provides a hierarchical error system where each module can define
//! its own error type that converts into the base [`Error`] type.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Base error type for all gateway errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Instance token errors.
    #[error("Instance error: {0}")]
    Instance(String),

    /// IPC transport errors.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Malformed messages or URLs.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// URL scheme registration errors.
    #[error("Registration error: {0}")]
    Registration(String),

    /// Credential verification errors.
    #[error("Security error: {0}")]
    Security(String),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid arguments provided.
    #[error("{0}")]
    InvalidArguments(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self { Self::Config(msg.into()) }

    /// Creates an instance token error.
    pub fn instance(msg: impl Into<String>) -> Self { Self::Instance(msg.into()) }

    /// Creates an IPC error.
    pub fn ipc(msg: impl Into<String>) -> Self { Self::Ipc(msg.into()) }

    /// Creates a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self { Self::Protocol(msg.into()) }

    /// Creates a registration error.
    pub fn registration(msg: impl Into<String>) -> Self { Self::Registration(msg.into()) }

    /// Creates a security error.
    pub fn security(msg: impl Into<String>) -> Self { Self::Security(msg.into()) }

    /// Creates an invalid arguments error.
    pub fn invalid_args(msg: impl Into<String>) -> Self { Self::InvalidArguments(msg.into()) }

    /// Creates a generic error.
    pub fn other(msg: impl Into<String>) -> Self { Self::Other(msg.into()) }
}

impl From<String> for Error {
    fn from(msg: String) -> Self { Self::Other(msg) }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self { Self::Other(msg.to_string()) }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self { Self::Config(err.to_string()) }
}
