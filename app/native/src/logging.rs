//! Logging initialization using the `tracing` crate.
//!
//! This module configures the tracing subscriber with sensible defaults:
//! - Uses `RUST_LOG` environment variable for filtering (default: `info`)
//! - Outputs to stderr so stdout stays free for CLI output
//! - Includes timestamps, target, and log levels

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the global tracing subscriber.
///
/// This should be called once at process startup, before any logging occurs.
///
/// The log level can be controlled via the `RUST_LOG` environment variable:
/// - `RUST_LOG=debug` - Show debug and above
/// - `RUST_LOG=secrandom_gateway=trace,warn` - Trace for the gateway, warn for others
///
/// Default level is `info` for release builds and `debug` for debug builds.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,secrandom_gateway={default_level}")));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(true)
        .compact();

    if tracing_subscriber::registry().with(filter).with(subscriber).try_init().is_err() {
        return;
    }

    tracing::debug!("logging initialized");
}
