#![allow(clippy::multiple_crate_versions)]

//! SecRandom gateway.
//!
//! Single-instance coordination and URL-triggered command routing for the
//! SecRandom desktop application:
//!
//! - [`platform::instance`] - One primary process per user session
//! - [`platform::protocol`] - OS registration of the `secrandom://` scheme
//! - [`platform::ipc`] - Activation and command channels over local sockets
//! - [`routing`] - Scheme URL parsing and dispatch to the [`surface`]
//! - [`security`] - Optional credential check for side-effecting commands
//! - [`gateway`] - The owned service object tying it all together

pub mod cli;
pub mod config;
pub mod core;
pub mod gateway;
pub mod logging;
pub mod platform;
pub mod routing;
pub mod security;
pub mod services;
pub mod surface;

pub use gateway::{Gateway, GatewayBuilder, Startup};
