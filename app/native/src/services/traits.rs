//! Background service trait definitions.
//!
//! Listeners owned by the primary instance implement [`BackgroundService`] so
//! the gateway can start and stop them uniformly.

/// Trait for components that run a background accept loop.
///
/// Implementations must be idempotent: starting a running service reports
/// success without spawning a duplicate, and stopping a stopped one is a no-op.
///
/// # Example
///
/// ```ignore
/// impl BackgroundService for CommandChannel {
///     fn name(&self) -> &'static str { "command-channel" }
///
///     fn start(&self) -> bool { self.start_server() }
///
///     fn stop(&self) { self.stop_server(); }
///
///     fn is_running(&self) -> bool { self.handle.lock().is_some() }
/// }
/// ```
pub trait BackgroundService: Send + Sync {
    /// Returns the service name for logging and identification.
    fn name(&self) -> &'static str;

    /// Starts the service. Returns `false` if it could not be started.
    fn start(&self) -> bool;

    /// Stops the service and waits for its accept loop to exit.
    fn stop(&self);

    /// Checks if the service is currently running.
    fn is_running(&self) -> bool;
}
