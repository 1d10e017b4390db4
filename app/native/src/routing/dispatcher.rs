//! Routes decoded commands to the action surface.

use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;

use super::parser::{self, UrlParseError};
use super::types::{Command, ParsedUrl};
use crate::services::{BridgeEvent, SchedulingBridge};
use crate::surface::{ActionSurface, SurfaceError};

/// Why a URL or command was not carried out.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] UrlParseError),

    #[error("unknown domain '{0}'")]
    UnknownDomain(String),

    #[error("unknown action '{action}' for domain '{domain}'")]
    UnknownAction { domain: String, action: String },

    #[error("action surface error: {0}")]
    Surface(#[from] SurfaceError),
}

const KNOWN_DOMAINS: [&str; 6] = ["settings", "main", "tray", "rollcall", "lottery", "window"];

/// Parses scheme URLs and drives the action surface.
///
/// Shared by both channels and the primary's own `--url` argument. Holds no
/// mutable state; every call is independent.
pub struct Dispatcher {
    scheme: String,
    surface: Arc<dyn ActionSurface>,
    bridge: Arc<dyn SchedulingBridge>,
}

impl Dispatcher {
    /// Creates a dispatcher for URLs of `scheme`.
    pub fn new(
        scheme: impl Into<String>,
        surface: Arc<dyn ActionSurface>,
        bridge: Arc<dyn SchedulingBridge>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            surface,
            bridge,
        }
    }

    /// The scheme this dispatcher accepts.
    #[must_use]
    pub fn scheme(&self) -> &str { &self.scheme }

    /// The scheduling bridge selected at startup.
    #[must_use]
    pub fn bridge(&self) -> &dyn SchedulingBridge { self.bridge.as_ref() }

    /// Parses a URL of this dispatcher's scheme.
    ///
    /// # Errors
    ///
    /// Returns the parse failure.
    pub fn parse(&self, raw: &str) -> Result<ParsedUrl, UrlParseError> {
        parser::parse(&self.scheme, raw)
    }

    /// Parses and dispatches `raw`, returning the routed fields.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the URL does not parse, names an unknown
    /// domain or action, or the surface refuses it.
    pub fn dispatch_url(&self, raw: &str) -> Result<Value, DispatchError> {
        let parsed = self.parse(raw)?;
        let command = Command::from_parsed(&parsed);
        self.dispatch(&command)?;

        Ok(json!({
            "domain": parsed.domain,
            "action": parsed.action,
            "params": parsed.params,
        }))
    }

    /// Carries out a decoded command.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownDomain`] or
    /// [`DispatchError::UnknownAction`] for [`Command::Unknown`], or the
    /// surface's failure.
    pub fn dispatch(&self, command: &Command) -> Result<(), DispatchError> {
        tracing::debug!(%command, "dispatching");

        match command {
            Command::Settings { page, preview } => {
                self.surface.show_settings(page.as_deref(), *preview)?;
            }
            Command::ShowPage(page) => self.surface.show_page(*page)?,
            Command::Tray(action) => self.surface.tray(*action)?,
            Command::Draw { target, action, params } => {
                self.surface.draw(*target, *action, params)?;
                if self.bridge.is_available() {
                    self.bridge.notify(&BridgeEvent {
                        domain: target.as_str().to_string(),
                        action: action.as_str().to_string(),
                        params: params.clone(),
                    });
                }
            }
            Command::Window { target, action } => self.surface.window(*target, *action)?,
            Command::Unknown { domain, action } => {
                if !KNOWN_DOMAINS.contains(&domain.as_str()) {
                    return Err(DispatchError::UnknownDomain(domain.clone()));
                }
                return Err(DispatchError::UnknownAction {
                    domain: domain.clone(),
                    action: action.clone().unwrap_or_default(),
                });
            }
        }

        Ok(())
    }

    /// Brings the application to the foreground.
    ///
    /// # Errors
    ///
    /// Returns the surface's failure.
    pub fn activate(&self) -> Result<(), DispatchError> {
        tracing::debug!("activating");
        self.surface.activate()?;
        Ok(())
    }
}
