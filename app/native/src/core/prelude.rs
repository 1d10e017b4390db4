//! Common re-exports for convenience.
//!
//! This module provides a prelude that can be imported to get access to
//! commonly used types throughout the gateway.
//!
//! # Usage
//!
//! ```ignore
//! use crate::core::prelude::*;
//! ```

pub use super::constants::{APP_NAME, APP_VERSION, BIN_NAME, DEFAULT_SCHEME};
pub use super::error::{Error, Result};
