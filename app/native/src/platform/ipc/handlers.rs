//! Command channel handler registry.
//!
//! Maps a message `type` to a handler. Guarded handlers only run after the
//! security gate accepts the payload's `verification` value; panics inside a
//! handler become a failed reply instead of taking the connection worker down.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Message, Response, UNKNOWN_TYPE_ERROR, URL_TYPE, VERIFICATION_FAILED_ERROR};
use crate::routing::{DispatchError, Dispatcher};
use crate::security::SecurityGate;

/// Failure reported by a command handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing or invalid field '{0}'")]
    InvalidField(&'static str),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    Failed(String),
}

/// A command handler: payload in, result out.
pub type HandlerFn = dyn Fn(&Map<String, Value>) -> Result<Value, HandlerError> + Send + Sync;

struct HandlerEntry {
    handler: Arc<HandlerFn>,
    guarded: bool,
}

/// Registry of command handlers, fixed once the channel starts.
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerEntry>,
    gate: SecurityGate,
}

impl HandlerRegistry {
    /// Creates a registry with the built-in, guarded `url` handler.
    #[must_use]
    pub fn new(gate: SecurityGate, dispatcher: Arc<Dispatcher>) -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            gate,
        };

        registry.register(URL_TYPE, true, move |payload| {
            let url = payload
                .get("url")
                .and_then(Value::as_str)
                .ok_or(HandlerError::InvalidField("url"))?;
            Ok(dispatcher.dispatch_url(url)?)
        });

        registry
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    ///
    /// Guarded handlers require a valid `verification` value in the payload.
    pub fn register<F>(&mut self, kind: impl Into<String>, guarded: bool, handler: F) -> &mut Self
    where F: Fn(&Map<String, Value>) -> Result<Value, HandlerError> + Send + Sync + 'static {
        self.handlers.insert(kind.into(), HandlerEntry {
            handler: Arc::new(handler),
            guarded,
        });
        self
    }

    /// Runs the handler for `message` and builds the reply.
    #[must_use]
    pub fn handle(&self, message: &Message) -> Response {
        let Some(entry) = self.handlers.get(&message.kind) else {
            tracing::debug!(kind = %message.kind, "no handler for message type");
            return Response::failure(UNKNOWN_TYPE_ERROR);
        };

        if entry.guarded && !self.gate.verify(message.payload.get("verification")) {
            tracing::warn!(kind = %message.kind, "rejected message: verification failed");
            return Response::failure(VERIFICATION_FAILED_ERROR);
        }

        let handler = &entry.handler;
        match panic::catch_unwind(AssertUnwindSafe(|| handler(&message.payload))) {
            Ok(Ok(result)) => Response::ok(result),
            Ok(Err(err)) => {
                tracing::debug!(kind = %message.kind, error = %err, "handler failed");
                Response::failure(err.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(kind = %message.kind, %reason, "handler panicked");
                Response::failure(reason)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}
