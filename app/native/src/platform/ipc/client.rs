//! Client side of both channels, used by secondary processes and the CLI.
//!
//! Every call runs its blocking socket I/O on a short-lived helper thread and
//! waits for each phase (connect, write, reply) with its own deadline, so a
//! hung primary can never keep a secondary process from exiting.

use std::io::{BufReader, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use interprocess::local_socket::Stream;

use super::activation::ActivationMessage;
use super::transport::{self, Endpoint};
use super::types::{Message, Response};
use crate::core::constants::ipc::{
    CONNECT_RETRY_INTERVAL, CONNECT_TIMEOUT, MAX_MESSAGE_BYTES, REPLY_TIMEOUT, WRITE_TIMEOUT,
};
use crate::core::{Error, Result};
use crate::services::thread::spawn_named_thread;

/// Per-phase time budgets for a client call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Budget for establishing the connection, including retries.
    pub connect: Duration,
    /// Budget for writing and flushing the request.
    pub write: Duration,
    /// Budget for receiving the reply (command channel only).
    pub reply: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            connect: CONNECT_TIMEOUT,
            write: WRITE_TIMEOUT,
            reply: REPLY_TIMEOUT,
        }
    }
}

enum Progress {
    Connected,
    Sent,
    Replied(String),
}

type ProgressSender = Sender<std::io::Result<Progress>>;

/// Sends a plain-text activation message to the primary.
///
/// # Errors
///
/// Returns `Error::Ipc` if the primary cannot be reached or the write does not
/// complete within its deadline.
pub fn send_activation(
    endpoint: &Endpoint,
    message: &ActivationMessage,
    deadlines: Deadlines,
) -> Result<()> {
    let frame = message.encode();
    if frame.len() > MAX_MESSAGE_BYTES {
        return Err(Error::protocol(format!(
            "activation message exceeds {MAX_MESSAGE_BYTES} bytes"
        )));
    }

    let rx = run_exchange(endpoint, deadlines.connect, move |stream, tx| {
        stream.write_all(frame.as_bytes())?;
        stream.flush()?;
        let _ = tx.send(Ok(Progress::Sent));
        Ok(())
    });

    await_progress(&rx, connect_wait(deadlines), "connect")?;
    await_progress(&rx, deadlines.write, "write")?;
    Ok(())
}

/// Sends one request over the command channel and returns the reply.
///
/// # Errors
///
/// Returns `Error::Ipc` on transport failures or timeouts, and `Error::Json`
/// if the reply is not a valid response object.
pub fn request(endpoint: &Endpoint, message: &Message, deadlines: Deadlines) -> Result<Response> {
    let frame = serde_json::to_string(message)?;
    if frame.len() >= MAX_MESSAGE_BYTES {
        return Err(Error::protocol(format!(
            "command message exceeds {MAX_MESSAGE_BYTES} bytes"
        )));
    }

    let rx = run_exchange(endpoint, deadlines.connect, move |stream, tx| {
        transport::write_frame(stream, &frame)?;
        let _ = tx.send(Ok(Progress::Sent));

        let mut reader = BufReader::new(stream);
        let reply = transport::read_frame(&mut reader, MAX_MESSAGE_BYTES)?;
        let _ = tx.send(Ok(Progress::Replied(reply)));
        Ok(())
    });

    await_progress(&rx, connect_wait(deadlines), "connect")?;
    await_progress(&rx, deadlines.write, "write")?;

    match await_progress(&rx, deadlines.reply, "reply")? {
        Progress::Replied(reply) => Ok(serde_json::from_str(&reply)?),
        Progress::Connected | Progress::Sent => Err(Error::ipc("reply: unexpected progress")),
    }
}

/// Checks whether something is listening on `endpoint` within `budget`.
#[must_use]
pub fn probe(endpoint: &Endpoint, budget: Duration) -> bool {
    let rx = run_exchange(endpoint, budget, |_, _| Ok(()));
    await_progress(&rx, budget + CONNECT_RETRY_INTERVAL, "probe").is_ok()
}

/// The connect phase retries internally; give the helper a little slack to
/// report its final failure before timing out on it.
fn connect_wait(deadlines: Deadlines) -> Duration { deadlines.connect + CONNECT_RETRY_INTERVAL * 4 }

fn run_exchange<F>(
    endpoint: &Endpoint,
    connect_budget: Duration,
    exchange: F,
) -> Receiver<std::io::Result<Progress>>
where
    F: FnOnce(&mut Stream, &ProgressSender) -> std::io::Result<()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let endpoint = endpoint.clone();

    // If the spawn fails the closure is dropped with its sender, which the
    // caller observes as a disconnected channel.
    let _ = spawn_named_thread("ipc-client", move || {
        let mut stream = match connect_with_retry(&endpoint, connect_budget) {
            Ok(stream) => stream,
            Err(err) => {
                let _ = tx.send(Err(err));
                return;
            }
        };

        let _ = tx.send(Ok(Progress::Connected));
        if let Err(err) = exchange(&mut stream, &tx) {
            let _ = tx.send(Err(err));
        }
    });

    rx
}

fn connect_with_retry(endpoint: &Endpoint, budget: Duration) -> std::io::Result<Stream> {
    let deadline = Instant::now() + budget;

    loop {
        match endpoint.connect() {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if Instant::now() + CONNECT_RETRY_INTERVAL >= deadline {
                    return Err(err);
                }
                tracing::trace!(endpoint = endpoint.name(), error = %err, "connect failed, retrying");
                thread::sleep(CONNECT_RETRY_INTERVAL);
            }
        }
    }
}

fn await_progress(
    rx: &Receiver<std::io::Result<Progress>>,
    budget: Duration,
    phase: &'static str,
) -> Result<Progress> {
    match rx.recv_timeout(budget) {
        Ok(Ok(progress)) => Ok(progress),
        Ok(Err(err)) => Err(Error::ipc(format!("{phase} failed: {err}"))),
        Err(RecvTimeoutError::Timeout) => {
            Err(Error::ipc(format!("{phase} timed out after {budget:?}")))
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::ipc(format!("{phase} aborted"))),
    }
}
