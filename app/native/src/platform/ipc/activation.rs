//! Activation channel: the plain-text handoff listener owned by the primary.
//!
//! A connection carries exactly one message, read until EOF or until the
//! connection deadline passes:
//!
//! - `activate` brings the primary's windows to the foreground.
//! - `url:<scheme-url>` dispatches the URL as if it were launched locally.
//!
//! Anything else is logged and ignored.

use std::sync::Arc;

use parking_lot::Mutex;

use super::server::ServerHandle;
use super::transport::{self, Connection, Endpoint};
use crate::core::constants::ipc::{ACTIVATE, MAX_MESSAGE_BYTES, URL_PREFIX};
use crate::routing::Dispatcher;
use crate::services::BackgroundService;

/// A decoded activation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationMessage {
    /// Bring the running instance to the foreground.
    Activate,
    /// Act on a scheme URL.
    Url(String),
}

impl ActivationMessage {
    /// Builds the message a secondary forwards for an optional `--url` value.
    #[must_use]
    pub fn from_url(url: Option<&str>) -> Self {
        match url.map(str::trim) {
            Some(url) if !url.is_empty() => Self::Url(url.to_string()),
            _ => Self::Activate,
        }
    }

    /// Encodes the message as it travels over the wire.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Activate => ACTIVATE.to_string(),
            Self::Url(url) => format!("{URL_PREFIX}{url}"),
        }
    }

    /// Classifies a received payload. Returns `None` if it is unrecognized.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == ACTIVATE {
            return Some(Self::Activate);
        }

        raw.strip_prefix(URL_PREFIX)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| Self::Url(url.to_string()))
    }
}

/// The primary-owned activation listener.
pub struct ActivationChannel {
    endpoint: Endpoint,
    dispatcher: Arc<Dispatcher>,
    handle: Mutex<Option<ServerHandle>>,
}

impl ActivationChannel {
    /// Creates a stopped channel bound to `endpoint` once started.
    #[must_use]
    pub fn new(endpoint: Endpoint, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            endpoint,
            dispatcher,
            handle: Mutex::new(None),
        }
    }

    /// The address this channel listens on.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint { &self.endpoint }
}

impl BackgroundService for ActivationChannel {
    fn name(&self) -> &'static str { "activation-channel" }

    fn start(&self) -> bool {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(ServerHandle::is_running) {
            return true;
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        match ServerHandle::spawn("activation", &self.endpoint, move |connection| {
            handle_activation(&dispatcher, connection);
        }) {
            Ok(server) => {
                *handle = Some(server);
                tracing::info!(endpoint = self.endpoint.name(), "activation channel listening");
                true
            }
            Err(err) => {
                tracing::warn!(
                    endpoint = self.endpoint.name(),
                    error = %err,
                    "failed to bind activation channel; continuing without handoff"
                );
                false
            }
        }
    }

    fn stop(&self) {
        if let Some(mut server) = self.handle.lock().take() {
            server.stop();
        }
    }

    fn is_running(&self) -> bool { self.handle.lock().as_ref().is_some_and(ServerHandle::is_running) }
}

fn handle_activation(dispatcher: &Dispatcher, connection: Connection) {
    let payload = match transport::read_to_limit(connection, MAX_MESSAGE_BYTES) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read activation message");
            return;
        }
    };

    let text = String::from_utf8_lossy(&payload);
    match ActivationMessage::decode(&text) {
        Some(ActivationMessage::Activate) => {
            if let Err(err) = dispatcher.activate() {
                tracing::warn!(error = %err, "activation failed");
            }
        }
        Some(ActivationMessage::Url(url)) => match dispatcher.dispatch_url(&url) {
            Ok(result) => tracing::debug!(%result, "activation url dispatched"),
            Err(err) => tracing::warn!(error = %err, "activation url rejected"),
        },
        None => tracing::warn!(bytes = payload.len(), "ignoring unrecognized activation message"),
    }
}
