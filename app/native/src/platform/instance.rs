//! Single-instance guard.
//!
//! The first process to allocate the instance token becomes the primary. Later
//! processes find the token taken, forward their activation to the primary over
//! the activation channel and exit. If the token is taken but the primary
//! cannot be reached, the process runs as primary anyway rather than fail.
//!
//! The token is an OS primitive that disappears with its owning process:
//!
//! - Unix: an exclusive `flock` on `<runtime_dir>/<name>.lock`, which also
//!   records the holder's pid
//! - Windows: a named mutex in the session-local namespace

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use crate::core::constants::instance::{ATTACH_GRACE, ATTACH_POLL_INTERVAL};
use crate::core::constants::ipc::ACTIVATION_SUFFIX;
use crate::platform::ipc::{self, ActivationMessage, Deadlines, Endpoint};

/// Outcome of [`InstanceGuard::acquire`].
#[derive(Debug)]
pub enum InstanceRole {
    /// This process holds the token. Dropping the token releases it.
    Primary(InstanceToken),
    /// Another instance is primary and accepted the forwarded activation.
    Secondary,
    /// The token is held elsewhere but the holder could not be reached; this
    /// process continues as primary without holding the token.
    Degraded,
}

impl InstanceRole {
    /// Whether this process should run the application.
    #[must_use]
    pub const fn runs_application(&self) -> bool { !matches!(self, Self::Secondary) }
}

/// Allocates the instance token and, on conflict, hands off to the primary.
#[derive(Debug, Clone)]
pub struct InstanceGuard {
    name: String,
    lock_dir: PathBuf,
    activation: Endpoint,
    deadlines: Deadlines,
}

impl InstanceGuard {
    /// Creates a guard for `name`, keeping its lock and socket files in `runtime_dir`.
    pub fn new(name: impl Into<String>, runtime_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let lock_dir = runtime_dir.into();
        let activation = Endpoint::new(format!("{name}-{ACTIVATION_SUFFIX}"), lock_dir.clone());

        Self {
            name,
            lock_dir,
            activation,
            deadlines: Deadlines::default(),
        }
    }

    /// Overrides the client deadlines used to reach the primary.
    #[must_use]
    pub const fn with_deadlines(mut self, deadlines: Deadlines) -> Self {
        self.deadlines = deadlines;
        self
    }

    /// Address of the primary's activation channel.
    #[must_use]
    pub const fn activation_endpoint(&self) -> &Endpoint { &self.activation }

    /// Attempts to allocate the token without any handoff.
    ///
    /// Returns `Ok(None)` if another process holds it.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the token cannot be allocated for another reason.
    pub fn try_acquire(&self) -> io::Result<Option<InstanceToken>> {
        token::try_create(&self.name, &self.lock_dir)
    }

    /// Determines this process's role, forwarding `message` if another
    /// instance is primary. Never fails: anomalies are logged and degrade to
    /// running as primary.
    #[must_use]
    pub fn acquire(&self, message: &ActivationMessage) -> InstanceRole {
        match self.try_acquire() {
            Ok(Some(token)) => {
                tracing::info!(instance = %self.name, "acquired instance token; running as primary");
                InstanceRole::Primary(token)
            }
            Ok(None) => self.hand_off(message),
            Err(err) => {
                tracing::warn!(
                    instance = %self.name,
                    error = %err,
                    "failed to allocate instance token; continuing as primary"
                );
                InstanceRole::Degraded
            }
        }
    }

    fn hand_off(&self, message: &ActivationMessage) -> InstanceRole {
        let holder = match self.attach() {
            Ok(holder) => holder,
            Err(err) => {
                tracing::warn!(
                    instance = %self.name,
                    error = %err,
                    "instance token is held but unreadable; continuing as primary"
                );
                return InstanceRole::Degraded;
            }
        };

        match ipc::send_activation(&self.activation, message, self.deadlines) {
            Ok(()) => {
                tracing::info!(instance = %self.name, ?holder, "forwarded activation to primary");
                InstanceRole::Secondary
            }
            Err(err) => {
                tracing::warn!(
                    instance = %self.name,
                    ?holder,
                    error = %err,
                    "could not reach existing instance; continuing as primary"
                );
                InstanceRole::Degraded
            }
        }
    }

    /// Confirms the token has a live holder, waiting briefly for a holder that
    /// is still publishing itself. Returns the holder's pid where known.
    fn attach(&self) -> io::Result<Option<u32>> {
        let deadline = Instant::now() + ATTACH_GRACE;
        loop {
            match token::holder(&self.name, &self.lock_dir) {
                Err(err) if err.kind() == io::ErrorKind::InvalidData && Instant::now() < deadline => {
                    thread::sleep(ATTACH_POLL_INTERVAL);
                }
                result => return result,
            }
        }
    }
}

pub use token::InstanceToken;

#[cfg(unix)]
mod token {
    use std::fs::{self, File, OpenOptions};
    use std::io::{self, Read, Seek, SeekFrom, Write};
    use std::os::fd::AsRawFd;
    use std::path::{Path, PathBuf};

    /// Exclusive lock on the instance lock file, held for the process lifetime.
    #[derive(Debug)]
    pub struct InstanceToken {
        file: File,
        path: PathBuf,
    }

    fn lock_path(name: &str, dir: &Path) -> PathBuf { dir.join(format!("{name}.lock")) }

    pub fn try_create(name: &str, dir: &Path) -> io::Result<Option<InstanceToken>> {
        fs::create_dir_all(dir)?;
        let path = lock_path(name, dir);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(None);
            }
            return Err(err);
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        write!(file, "{}", std::process::id())?;
        file.sync_data()?;

        Ok(Some(InstanceToken { file, path }))
    }

    /// Reads the holder's pid. An empty or garbled record is `InvalidData`.
    pub fn holder(name: &str, dir: &Path) -> io::Result<Option<u32>> {
        let mut contents = String::new();
        File::open(lock_path(name, dir))?.read_to_string(&mut contents)?;

        contents
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "lock file has no holder pid"))
    }

    impl InstanceToken {
        /// Path of the lock file.
        #[must_use]
        pub fn path(&self) -> &Path { &self.path }
    }

    impl Drop for InstanceToken {
        fn drop(&mut self) {
            // The lock itself goes away when the descriptor closes.
            if let Err(err) = self.file.set_len(0) {
                tracing::debug!(error = %err, "failed to clear instance lock file");
            }
        }
    }
}

#[cfg(windows)]
mod token {
    use std::io;
    use std::path::Path;

    use windows::Win32::Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError, HANDLE};
    use windows::Win32::System::Threading::{CreateMutexW, OpenMutexW, SYNCHRONIZATION_SYNCHRONIZE};
    use windows::core::HSTRING;

    /// Named mutex owned for the process lifetime.
    #[derive(Debug)]
    pub struct InstanceToken {
        // Stored as an integer so the token can move between threads.
        handle: isize,
    }

    fn mutex_name(name: &str) -> HSTRING { HSTRING::from(format!("Local\\SecRandom-{name}")) }

    pub fn try_create(name: &str, _dir: &Path) -> io::Result<Option<InstanceToken>> {
        // SAFETY: the name outlives the call; the returned handle is owned by the token.
        let handle =
            unsafe { CreateMutexW(None, false, &mutex_name(name)) }.map_err(io::Error::other)?;

        // SAFETY: reads the calling thread's last-error value set by CreateMutexW.
        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            // SAFETY: the handle was just returned to us and is closed once.
            let _ = unsafe { CloseHandle(handle) };
            return Ok(None);
        }

        Ok(Some(InstanceToken {
            handle: handle.0 as isize,
        }))
    }

    /// Opens the existing mutex to confirm it is live. Windows mutexes carry
    /// no owner pid.
    pub fn holder(name: &str, _dir: &Path) -> io::Result<Option<u32>> {
        // SAFETY: the name outlives the call; the handle is closed immediately.
        let handle = unsafe { OpenMutexW(SYNCHRONIZATION_SYNCHRONIZE, false, &mutex_name(name)) }
            .map_err(io::Error::other)?;
        // SAFETY: the handle was just returned to us and is closed once.
        let _ = unsafe { CloseHandle(handle) };
        Ok(None)
    }

    impl Drop for InstanceToken {
        fn drop(&mut self) {
            // SAFETY: the handle came from CreateMutexW and is closed exactly once.
            let _ = unsafe { CloseHandle(HANDLE(self.handle as *mut std::ffi::c_void)) };
        }
    }
}
