//! Process shutdown coordination.
//!
//! The host's main thread blocks on [`ShutdownSignal::wait`] while the
//! channels run; tray actions request an exit or a restart from any thread.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Why the host is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequest {
    /// Stop and exit the process.
    Exit,
    /// Stop and relaunch the current executable.
    Restart,
}

#[derive(Default)]
struct Inner {
    request: Mutex<Option<ExitRequest>>,
    changed: Condvar,
}

/// Cloneable one-shot shutdown signal.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    /// Creates a signal with no pending request.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Records a shutdown request. The first request wins.
    pub fn request(&self, request: ExitRequest) {
        let mut slot = self.inner.request.lock();
        if slot.is_none() {
            *slot = Some(request);
            self.inner.changed.notify_all();
        }
    }

    /// Returns the pending request, if any.
    #[must_use]
    pub fn pending(&self) -> Option<ExitRequest> { *self.inner.request.lock() }

    /// Blocks until a request is recorded and returns it.
    #[must_use]
    pub fn wait(&self) -> ExitRequest {
        let mut slot = self.inner.request.lock();
        loop {
            if let Some(request) = *slot {
                return request;
            }
            self.inner.changed.wait(&mut slot);
        }
    }
}
