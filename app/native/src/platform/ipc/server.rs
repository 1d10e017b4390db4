//! Accept loop shared by the activation and command channels.
//!
//! Each listener runs on one dedicated background thread and polls a
//! non-blocking `accept`, so stopping is deterministic: raise the cancellation
//! flag, join, then wait (bounded) for in-flight connections. Every accepted
//! connection is served on its own worker thread under a read deadline. Once
//! the worker cap is reached the loop stops accepting, and new peers wait in
//! the listen backlog until a slot frees up.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use interprocess::local_socket::prelude::*;
use interprocess::local_socket::{Listener, Stream};

use super::transport::{Connection, Endpoint};
use crate::core::constants::ipc::{
    ACCEPT_POLL_INTERVAL, CONNECTION_READ_TIMEOUT, DRAIN_TIMEOUT, MAX_CONCURRENT_CONNECTIONS,
};
use crate::services::thread::spawn_named_thread;

/// Handle to a running accept loop. Dropping it stops the loop.
pub struct ServerHandle {
    label: &'static str,
    cancel: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Binds `endpoint` and starts serving each connection with `serve`.
    ///
    /// # Errors
    ///
    /// Returns the bind error, or an error if the accept thread cannot be spawned.
    pub fn spawn<F>(label: &'static str, endpoint: &Endpoint, serve: F) -> io::Result<Self>
    where F: Fn(Connection) + Send + Sync + 'static {
        let listener = endpoint.bind()?;
        let cancel = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicUsize::new(0));
        let loop_cancel = Arc::clone(&cancel);
        let loop_active = Arc::clone(&active);
        let serve = Arc::new(serve);

        let thread = spawn_named_thread(label, move || {
            accept_loop(label, &listener, &loop_cancel, &loop_active, &serve);
        })
        .ok_or_else(|| io::Error::other(format!("failed to spawn {label} accept thread")))?;

        tracing::debug!(channel = label, endpoint = endpoint.name(), "accept loop started");

        Ok(Self {
            label,
            cancel,
            active,
            thread: Some(thread),
        })
    }

    /// Checks whether the accept loop is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }

    /// Number of connections currently being served.
    #[must_use]
    pub fn active_connections(&self) -> usize { self.active.load(Ordering::Acquire) }

    /// Cancels the accept loop, waits for it to exit, then waits up to
    /// [`DRAIN_TIMEOUT`] for connections already being served.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Release);

        let Some(thread) = self.thread.take() else {
            return;
        };

        if thread.join().is_err() {
            tracing::warn!(channel = self.label, "accept loop panicked");
        }

        let deadline = Instant::now() + DRAIN_TIMEOUT;
        loop {
            let remaining = self.active_connections();
            if remaining == 0 {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(channel = self.label, remaining, "connections still open at shutdown");
                break;
            }
            thread::sleep(ACCEPT_POLL_INTERVAL);
        }

        tracing::debug!(channel = self.label, "accept loop stopped");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) { self.stop(); }
}

/// Decrements the live-worker count when a worker finishes, even on panic.
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::AcqRel); }
}

fn accept_loop<F>(
    label: &'static str,
    listener: &Listener,
    cancel: &AtomicBool,
    active: &Arc<AtomicUsize>,
    serve: &Arc<F>,
) where
    F: Fn(Connection) + Send + Sync + 'static,
{
    let mut saturated = false;

    while !cancel.load(Ordering::Acquire) {
        if active.load(Ordering::Acquire) >= MAX_CONCURRENT_CONNECTIONS {
            if !saturated {
                tracing::warn!(channel = label, "connection limit reached; deferring new peers");
                saturated = true;
            }
            thread::sleep(ACCEPT_POLL_INTERVAL);
            continue;
        }
        saturated = false;

        match listener.accept() {
            Ok(stream) => serve_on_worker(label, stream, active, serve),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) => {
                tracing::warn!(channel = label, error = %err, "failed to accept connection");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

fn serve_on_worker<F>(label: &'static str, stream: Stream, active: &Arc<AtomicUsize>, serve: &Arc<F>)
where F: Fn(Connection) + Send + Sync + 'static {
    active.fetch_add(1, Ordering::AcqRel);
    let slot = WorkerSlot(Arc::clone(active));
    let serve = Arc::clone(serve);

    // A failed spawn drops the closure, which releases the slot and closes the stream.
    let _ = spawn_named_thread(&format!("{label}-conn"), move || {
        let _slot = slot;
        serve(Connection::new(stream, CONNECTION_READ_TIMEOUT));
    });
}
