//! Application constants for the SecRandom gateway.
//!
//! This module contains global constants used throughout the gateway,
//! including default names, wire-protocol limits and client timeouts.

/// The application name.
pub const APP_NAME: &str = "SecRandom";

/// Application version from Cargo.toml.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name used in help output and shell completions.
pub const BIN_NAME: &str = "secrandom-gateway";

/// Default custom URI scheme registered with the OS.
pub const DEFAULT_SCHEME: &str = "secrandom";

/// Default name the instance token and activation address are derived from.
pub const DEFAULT_INSTANCE_NAME: &str = "SecRandom";

/// Default command channel address name.
pub const DEFAULT_COMMAND_CHANNEL: &str = "secrandom-ipc";

/// Command-line flag carrying a scheme URL to a freshly launched process.
pub const URL_FLAG: &str = "--url";

/// Local IPC limits and timeouts.
pub mod ipc {
    use std::time::Duration;

    /// Upper bound for a single message read from either channel.
    pub const MAX_MESSAGE_BYTES: usize = 4096;

    /// Client-side connect budget.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Client-side write/flush budget.
    pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

    /// Client-side budget for a command channel reply.
    pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Delay between connect attempts while the primary is still binding.
    pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(25);

    /// How often an accept loop checks its cancellation flag.
    pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

    /// Maximum number of live connection workers per listener. Further
    /// connections wait in the listen backlog until a worker finishes.
    pub const MAX_CONCURRENT_CONNECTIONS: usize = 16;

    /// Server-side budget for a peer to deliver its whole request.
    pub const CONNECTION_READ_TIMEOUT: Duration = Duration::from_secs(2);

    /// Server-side budget for writing a reply.
    pub const CONNECTION_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

    /// Retry interval for a non-blocking connection that would block.
    pub const IO_POLL_INTERVAL: Duration = Duration::from_millis(5);

    /// How long stopping a listener waits for in-flight connections.
    pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(4);

    /// Plain-text activation payload.
    pub const ACTIVATE: &str = "activate";

    /// Prefix of a plain-text activation payload carrying a URL.
    pub const URL_PREFIX: &str = "url:";

    /// Suffix appended to the instance name to form the activation address.
    pub const ACTIVATION_SUFFIX: &str = "activation";
}

/// Instance token constants.
pub mod instance {
    use std::time::Duration;

    /// How long a secondary waits for the holder to publish its record.
    pub const ATTACH_GRACE: Duration = Duration::from_millis(500);

    /// Poll interval while waiting for the holder record.
    pub const ATTACH_POLL_INTERVAL: Duration = Duration::from_millis(20);
}

/// Configuration and state file names.
pub mod config {
    /// Directory name under the user's config/data directories.
    pub const APP_DIR: &str = "secrandom";

    /// Configuration file names in priority order.
    pub const CONFIG_FILE_NAMES: &[&str] = &["gateway.jsonc", "gateway.json"];

    /// Environment variable pointing at an explicit configuration file.
    pub const CONFIG_ENV: &str = "SECRANDOM_GATEWAY_CONFIG";

    /// File recording the bound command channel address.
    pub const ENDPOINT_RECORD_FILE: &str = "ipc-endpoint.json";
}
