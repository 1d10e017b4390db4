//! The application action surface: whatever finally acts on a command.
//!
//! The gateway only decodes and routes. A GUI host implements
//! [`ActionSurface`] to drive its windows; the binary ships a headless
//! [`LoggingSurface`].

mod headless;

pub use headless::LoggingSurface;
use thiserror::Error;

use crate::routing::{DrawAction, DrawTarget, Page, Params, TrayAction, WindowAction, WindowTarget};

/// Failure reported by an action surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The target exists but cannot act right now (e.g. window not created yet).
    #[error("{0} is unavailable")]
    Unavailable(String),
}

/// Receiver of decoded commands.
///
/// Called from connection worker threads; implementations must hand
/// long-running work off to their own event loop and return promptly.
pub trait ActionSurface: Send + Sync {
    /// Brings the application to the foreground.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`] if the surface cannot act.
    fn activate(&self) -> Result<(), SurfaceError>;

    /// Shows the settings window at `page`, optionally in preview mode.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`] if the surface cannot act.
    fn show_settings(&self, page: Option<&str>, preview: bool) -> Result<(), SurfaceError>;

    /// Shows a main window page.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`] if the surface cannot act.
    fn show_page(&self, page: Page) -> Result<(), SurfaceError>;

    /// Performs a tray menu action.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`] if the surface cannot act.
    fn tray(&self, action: TrayAction) -> Result<(), SurfaceError>;

    /// Forwards a control verb and its parameters to a draw panel.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`] if the surface cannot act.
    fn draw(&self, target: DrawTarget, action: DrawAction, params: &Params)
    -> Result<(), SurfaceError>;

    /// Changes a window's visibility.
    ///
    /// # Errors
    ///
    /// Returns a [`SurfaceError`] if the surface cannot act.
    fn window(&self, target: WindowTarget, action: WindowAction) -> Result<(), SurfaceError>;
}
