//! Core infrastructure for the gateway.
//!
//! This module provides foundational types used throughout the crate:
//!
//! - [`error`] - Unified error types
//! - [`constants`] - Application constants, wire limits and timeouts
//! - [`prelude`] - Common re-exports for convenience

pub mod constants;
pub mod error;
pub mod prelude;

pub use error::{Error, Result};
