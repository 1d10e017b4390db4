//! Integration tests for the SecRandom gateway.
//!
//! These tests run real gateways inside the test process: each one gets its
//! own instance name, command channel name and scratch directories, so tests
//! can run in parallel without seeing each other.
//!
//! ## Running Integration Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p secrandom-gateway --test integration
//!
//! # Run one module
//! cargo test -p secrandom-gateway --test integration gateway__command_channel
//! ```
//!
//! ## Test Organization
//!
//! Tests follow the naming convention `<module>__<test_name>` to allow filtering by module:
//! - `gateway__*` - Instance coordination and channels, end to end
//! - `protocol__*` - URL scheme registration

// Allow double-underscore naming for test modules (e.g., gateway__activation)
#![allow(non_snake_case)]
// Relax clippy lints for integration tests - these are test utilities, not production code
#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::redundant_clone,
    clippy::wildcard_imports
)]

mod common;

mod gateway__activation;
mod gateway__command_channel;
mod gateway__single_instance;

#[cfg(target_os = "linux")]
mod protocol__linux_registration;
