//! Custom URL scheme registration.
//!
//! [`ProtocolRegistrar`] maps the scheme to "run this executable with
//! `--url <value>`" in the current user's OS settings. Every operation is
//! best-effort: OS failures are logged and reported as `false`.
//!
//! - Linux: a `.desktop` entry plus the default `x-scheme-handler` association
//! - Windows: per-user registry keys under `Software\Classes`

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

use std::io;
use std::path::PathBuf;

/// OS-specific registration mechanics.
pub trait RegistrationBackend: Send + Sync {
    /// Creates or overwrites the registration.
    ///
    /// # Errors
    ///
    /// Returns the OS error that prevented registration.
    fn register(&self) -> io::Result<()>;

    /// Removes the registration. Absent entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns the OS error that prevented removal.
    fn unregister(&self) -> io::Result<()>;

    /// Reports whether the scheme currently resolves to this executable.
    ///
    /// # Errors
    ///
    /// Returns the OS error that prevented the lookup.
    fn is_registered(&self) -> io::Result<bool>;
}

/// Backend for platforms without scheme registration support.
struct UnsupportedBackend {
    reason: String,
}

impl UnsupportedBackend {
    fn error(&self) -> io::Error { io::Error::new(io::ErrorKind::Unsupported, self.reason.clone()) }
}

impl RegistrationBackend for UnsupportedBackend {
    fn register(&self) -> io::Result<()> { Err(self.error()) }

    fn unregister(&self) -> io::Result<()> { Err(self.error()) }

    fn is_registered(&self) -> io::Result<bool> { Err(self.error()) }
}

/// Registers, unregisters and queries the URL scheme.
pub struct ProtocolRegistrar {
    scheme: String,
    backend: Box<dyn RegistrationBackend>,
}

impl ProtocolRegistrar {
    /// Creates a registrar using an explicit backend.
    pub fn with_backend(scheme: impl Into<String>, backend: impl RegistrationBackend + 'static) -> Self {
        Self {
            scheme: scheme.into(),
            backend: Box::new(backend),
        }
    }

    /// Creates a registrar for the running executable on this platform.
    #[must_use]
    pub fn for_current_exe(scheme: &str) -> Self {
        match std::env::current_exe() {
            Ok(exe) => Self::for_exe(scheme, exe),
            Err(err) => Self::with_backend(scheme, UnsupportedBackend {
                reason: format!("cannot resolve current executable: {err}"),
            }),
        }
    }

    #[cfg(target_os = "linux")]
    fn for_exe(scheme: &str, exe: PathBuf) -> Self {
        match linux::LinuxDesktopBackend::for_user(scheme, exe) {
            Ok(backend) => Self::with_backend(scheme, backend),
            Err(err) => Self::with_backend(scheme, UnsupportedBackend {
                reason: err.to_string(),
            }),
        }
    }

    #[cfg(windows)]
    fn for_exe(scheme: &str, exe: PathBuf) -> Self {
        Self::with_backend(scheme, windows::WindowsRegistryBackend::new(scheme, exe))
    }

    #[cfg(not(any(target_os = "linux", windows)))]
    fn for_exe(scheme: &str, exe: PathBuf) -> Self {
        Self::with_backend(scheme, UnsupportedBackend {
            reason: format!(
                "URL scheme registration is not supported on this platform ({})",
                exe.display()
            ),
        })
    }

    /// The scheme being managed.
    #[must_use]
    pub fn scheme(&self) -> &str { &self.scheme }

    /// Registers the scheme. Repeating it leaves a single, unchanged registration.
    #[must_use]
    pub fn register(&self) -> bool {
        match self.backend.register() {
            Ok(()) => {
                tracing::info!(scheme = %self.scheme, "registered URL scheme");
                true
            }
            Err(err) => {
                tracing::warn!(scheme = %self.scheme, error = %err, "failed to register URL scheme");
                false
            }
        }
    }

    /// Removes the registration. Succeeds if it was already absent.
    #[must_use]
    pub fn unregister(&self) -> bool {
        match self.backend.unregister() {
            Ok(()) => {
                tracing::info!(scheme = %self.scheme, "unregistered URL scheme");
                true
            }
            Err(err) => {
                tracing::warn!(scheme = %self.scheme, error = %err, "failed to unregister URL scheme");
                false
            }
        }
    }

    /// Whether the scheme currently launches this executable.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.backend.is_registered().unwrap_or_else(|err| {
            tracing::warn!(scheme = %self.scheme, error = %err, "failed to query URL scheme registration");
            false
        })
    }
}
