//! Service infrastructure for the gateway.
//!
//! - [`traits`] - Background service trait implemented by the channels
//! - [`thread`] - Named thread spawning
//! - [`shutdown`] - Exit and restart coordination
//! - [`bridge`] - Optional scheduling application bridge

pub mod bridge;
pub mod shutdown;
pub mod thread;
pub mod traits;

pub use bridge::{BridgeEvent, SchedulingBridge, SocketBridge, UnavailableBridge};
pub use shutdown::{ExitRequest, ShutdownSignal};
pub use traits::BackgroundService;
