//! Headless action surface used by the standalone binary.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{ActionSurface, SurfaceError};
use crate::routing::{DrawAction, DrawTarget, Page, Params, TrayAction, WindowAction, WindowTarget};
use crate::services::{ExitRequest, ShutdownSignal};

/// Logs every command and keeps track of which windows would be visible.
///
/// Tray `exit` and `restart` are turned into requests on the shutdown signal.
pub struct LoggingSurface {
    windows: Mutex<HashMap<WindowTarget, bool>>,
    shutdown: ShutdownSignal,
}

impl LoggingSurface {
    /// Creates a surface with every window hidden.
    #[must_use]
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Whether `target` is currently visible.
    #[must_use]
    pub fn is_visible(&self, target: WindowTarget) -> bool {
        self.windows.lock().get(&target).copied().unwrap_or(false)
    }

    fn set_visible(&self, target: WindowTarget, action: WindowAction) -> bool {
        let mut windows = self.windows.lock();
        let visible = windows.entry(target).or_insert(false);
        *visible = match action {
            WindowAction::Show => true,
            WindowAction::Hide => false,
            WindowAction::Toggle => !*visible,
        };
        *visible
    }
}

impl ActionSurface for LoggingSurface {
    fn activate(&self) -> Result<(), SurfaceError> {
        self.set_visible(WindowTarget::Main, WindowAction::Show);
        tracing::info!("activate: main window to foreground");
        Ok(())
    }

    fn show_settings(&self, page: Option<&str>, preview: bool) -> Result<(), SurfaceError> {
        self.set_visible(WindowTarget::Settings, WindowAction::Show);
        tracing::info!(page = page.unwrap_or("home"), preview, "show settings");
        Ok(())
    }

    fn show_page(&self, page: Page) -> Result<(), SurfaceError> {
        self.set_visible(WindowTarget::Main, WindowAction::Show);
        tracing::info!(?page, "show page");
        Ok(())
    }

    fn tray(&self, action: TrayAction) -> Result<(), SurfaceError> {
        tracing::info!(?action, "tray action");
        match action {
            TrayAction::ShowHideMainWindow => {
                self.set_visible(WindowTarget::Main, WindowAction::Toggle);
            }
            TrayAction::OpenSettings => {
                self.set_visible(WindowTarget::Settings, WindowAction::Show);
            }
            TrayAction::ToggleFloatWindow => {
                self.set_visible(WindowTarget::Float, WindowAction::Toggle);
            }
            TrayAction::Restart => self.shutdown.request(ExitRequest::Restart),
            TrayAction::Exit => self.shutdown.request(ExitRequest::Exit),
        }
        Ok(())
    }

    fn draw(
        &self,
        target: DrawTarget,
        action: DrawAction,
        params: &Params,
    ) -> Result<(), SurfaceError> {
        tracing::info!(
            panel = target.as_str(),
            action = action.as_str(),
            params = params.len(),
            "draw control"
        );
        Ok(())
    }

    fn window(&self, target: WindowTarget, action: WindowAction) -> Result<(), SurfaceError> {
        let visible = self.set_visible(target, action);
        tracing::info!(?target, ?action, visible, "window visibility");
        Ok(())
    }
}
