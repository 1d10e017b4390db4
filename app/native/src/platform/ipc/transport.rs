//! Local socket transport shared by both channels.
//!
//! On Unix, addresses are socket files inside the runtime directory, which is
//! kept private to its owner (mode `0700`), so only the same user can connect
//! or squat a name. Abstract sockets are avoided on purpose: they carry no
//! permissions. On Windows, addresses are named pipes. Names are scoped to the
//! current user so two sessions on one machine never see each other's primary.
//!
//! Accepted streams are non-blocking and wrapped in a [`Connection`], whose
//! reads and writes fail with `TimedOut` once the connection deadline passes.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use interprocess::local_socket::prelude::*;
use interprocess::local_socket::{
    GenericFilePath, GenericNamespaced, Listener, ListenerNonblockingMode, ListenerOptions, Name,
    Stream,
};
use serde::de::DeserializeOwned;

use crate::core::constants::ipc::IO_POLL_INTERVAL;

/// A well-known local address derived from a logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    name: String,
    socket_dir: PathBuf,
}

impl Endpoint {
    /// Creates an endpoint for `name`, placing socket files (when needed) in `socket_dir`.
    pub fn new(name: impl Into<String>, socket_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            socket_dir: socket_dir.into(),
        }
    }

    /// The logical name this endpoint was created from.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Path of the socket file used on Unix.
    #[must_use]
    pub fn socket_path(&self) -> PathBuf {
        self.socket_dir.join(format!("{}.sock", scoped_name(&self.name)))
    }

    fn socket_name(&self) -> io::Result<Name<'static>> {
        if uses_named_pipes() {
            scoped_name(&self.name).to_ns_name::<GenericNamespaced>()
        } else {
            self.socket_path().to_fs_name::<GenericFilePath>()
        }
    }

    /// Binds a listener whose `accept` and accepted streams never block.
    ///
    /// A leftover socket file nobody answers on is removed first; a live one
    /// yields `AddrInUse`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the address cannot be bound, or
    /// `PermissionDenied` if the socket directory belongs to another user.
    pub fn bind(&self) -> io::Result<Listener> {
        if !uses_named_pipes() {
            ensure_private_dir(&self.socket_dir)?;
            self.reclaim_stale_socket()?;
        }

        ListenerOptions::new()
            .name(self.socket_name()?)
            .nonblocking(ListenerNonblockingMode::Both)
            .create_sync()
    }

    /// Opens a blocking connection to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns the OS error if nobody is listening.
    pub fn connect(&self) -> io::Result<Stream> { Stream::connect(self.socket_name()?) }

    fn reclaim_stale_socket(&self) -> io::Result<()> {
        let path = self.socket_path();
        if !path.exists() {
            return Ok(());
        }

        if self.connect().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("{} is owned by a live listener", path.display()),
            ));
        }

        tracing::debug!(path = %path.display(), "removing stale socket file");
        remove_if_exists(&path)
    }
}

const fn uses_named_pipes() -> bool { cfg!(windows) }

/// Creates `dir` readable only by its owner, tightening an existing one.
#[cfg(unix)]
fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::{DirBuilderExt, MetadataExt, PermissionsExt};

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;

    let metadata = fs::metadata(dir)?;
    if metadata.uid() != current_uid() {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("{} is owned by another user", dir.display()),
        ));
    }

    if metadata.permissions().mode() & 0o077 != 0 {
        tracing::debug!(dir = %dir.display(), "restricting socket directory to its owner");
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

#[cfg(not(unix))]
fn ensure_private_dir(dir: &Path) -> io::Result<()> { fs::create_dir_all(dir) }

#[cfg(unix)]
fn current_uid() -> libc::uid_t {
    // SAFETY: getuid has no preconditions and cannot fail.
    unsafe { libc::getuid() }
}

/// Appends a per-user suffix so addresses are private to one user session.
fn scoped_name(name: &str) -> String { format!("{name}.{}", session_scope()) }

#[cfg(unix)]
fn session_scope() -> String { current_uid().to_string() }

#[cfg(not(unix))]
fn session_scope() -> String {
    std::env::var("USERNAME").unwrap_or_else(|_| "user".to_string())
}

/// An accepted stream whose reads and writes give up at a deadline.
///
/// The wrapped stream must be non-blocking; `WouldBlock` is retried every
/// [`IO_POLL_INTERVAL`] until the deadline, then reported as `TimedOut`. A
/// peer that connects and stalls therefore releases its worker.
pub struct Connection<S = Stream> {
    stream: S,
    deadline: Instant,
}

impl<S> Connection<S> {
    /// Wraps `stream`, allowing `budget` for the exchange.
    pub fn new(stream: S, budget: Duration) -> Self {
        Self {
            stream,
            deadline: Instant::now() + budget,
        }
    }

    /// Restarts the deadline with a fresh `budget`.
    pub fn extend(&mut self, budget: Duration) { self.deadline = Instant::now() + budget; }

    fn retry<T>(&mut self, mut op: impl FnMut(&mut S) -> io::Result<T>) -> io::Result<T> {
        loop {
            match op(&mut self.stream) {
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= self.deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "peer stalled past the connection deadline",
                        ));
                    }
                    thread::sleep(IO_POLL_INTERVAL);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                result => return result,
            }
        }
    }
}

impl<S: Read> Read for Connection<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { self.retry(|stream| stream.read(buf)) }
}

impl<S: Write> Write for Connection<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.retry(|stream| stream.write(buf)) }

    fn flush(&mut self) -> io::Result<()> { self.retry(Write::flush) }
}

/// Removes a file, treating "already absent" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Reads until EOF, rejecting payloads larger than `limit` bytes.
///
/// A peer that disconnects abruptly (broken pipe) is treated as EOF.
///
/// # Errors
///
/// Returns `InvalidData` for oversized payloads, or the underlying read error.
pub fn read_to_limit<R: Read>(reader: R, limit: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit.min(512));
    match reader.take(limit as u64 + 1).read_to_end(&mut buf) {
        Err(err) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err),
        _ => {}
    }

    if buf.len() > limit {
        return Err(oversized(limit));
    }

    Ok(buf)
}

/// Reads one newline-terminated UTF-8 frame of at most `limit` bytes.
///
/// The terminator is stripped. A final frame without terminator is accepted.
///
/// # Errors
///
/// Returns `UnexpectedEof` when the peer sent nothing, `InvalidData` for
/// oversized or non-UTF-8 frames, or the underlying read error.
pub fn read_frame<R: BufRead>(reader: &mut R, limit: usize) -> io::Result<String> {
    let mut buf = Vec::with_capacity(limit.min(512));
    reader.take(limit as u64 + 1).read_until(b'\n', &mut buf)?;

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > limit {
        return Err(oversized(limit));
    }

    if buf.is_empty() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty frame"));
    }

    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Reads one JSON value of at most `limit` bytes.
///
/// The value ends at its closing delimiter, so the peer neither has to send a
/// trailing newline nor close its side. Anything after the value is left unread.
///
/// # Errors
///
/// Returns `UnexpectedEof` when the peer sent nothing, `InvalidData` for
/// oversized or malformed values, or the underlying read error.
pub fn read_json<T: DeserializeOwned, R: Read>(reader: R, limit: usize) -> io::Result<T> {
    let mut limited = reader.take(limit as u64 + 1);
    let next = serde_json::Deserializer::from_reader(&mut limited).into_iter::<T>().next();
    let exhausted = limited.limit() == 0;

    match next {
        Some(Ok(value)) => Ok(value),
        Some(Err(_)) | None if exhausted => Err(oversized(limit)),
        Some(Err(err)) => Err(err.into()),
        None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty message")),
    }
}

/// Writes `frame` followed by a newline and flushes.
///
/// # Errors
///
/// Returns the underlying write error.
pub fn write_frame<W: Write>(writer: &mut W, frame: &str) -> io::Result<()> {
    writer.write_all(frame.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn oversized(limit: usize) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("message exceeds {limit} bytes"))
}
