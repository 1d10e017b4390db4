//! Command-line entry point.

mod commands;

use clap::Parser;
pub use commands::{Cli, Commands, ProtocolCommands};

use crate::core::Result;

/// Parses the process arguments and runs the selected command.
///
/// # Errors
///
/// Returns the command's error; the binary prints it and exits with status 1.
pub fn run() -> Result<()> {
    crate::logging::init();
    Cli::parse().execute()
}
