//! Thread utilities.

use std::thread::{self, JoinHandle};

/// Spawns a named background thread, logging instead of panicking on failure.
///
/// Thread names are prefixed with `secrandom-` so they stand out in debuggers
/// and in log output.
pub fn spawn_named_thread<F>(name: &str, task: F) -> Option<JoinHandle<()>>
where F: FnOnce() + Send + 'static {
    let thread_name = format!("secrandom-{name}");

    match thread::Builder::new().name(thread_name.clone()).spawn(task) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::error!(thread = %thread_name, error = %err, "failed to spawn thread");
            None
        }
    }
}
