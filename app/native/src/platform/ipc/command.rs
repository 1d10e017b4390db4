//! Command channel: the JSON request/response listener owned by the primary.
//!
//! Each connection carries one JSON request object and receives one
//! newline-terminated reply frame before the server closes it. The request
//! ends at its closing brace; a trailing newline is accepted but not needed.

use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::handlers::HandlerRegistry;
use super::record::EndpointRecord;
use super::server::ServerHandle;
use super::transport::{self, Connection, Endpoint};
use super::types::{Message, Response};
use crate::core::constants::ipc::{CONNECTION_WRITE_TIMEOUT, MAX_MESSAGE_BYTES};
use crate::services::BackgroundService;

struct RecordTarget {
    state_dir: PathBuf,
    scheme: String,
}

/// The primary-owned command listener.
pub struct CommandChannel {
    endpoint: Endpoint,
    registry: Arc<HandlerRegistry>,
    record: Option<RecordTarget>,
    handle: Mutex<Option<ServerHandle>>,
}

impl CommandChannel {
    /// Creates a stopped channel serving `registry` on `endpoint`.
    #[must_use]
    pub fn new(endpoint: Endpoint, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            endpoint,
            registry,
            record: None,
            handle: Mutex::new(None),
        }
    }

    /// Persists an [`EndpointRecord`] in `state_dir` while the channel runs.
    #[must_use]
    pub fn with_endpoint_record(
        mut self,
        state_dir: impl Into<PathBuf>,
        scheme: impl Into<String>,
    ) -> Self {
        self.record = Some(RecordTarget {
            state_dir: state_dir.into(),
            scheme: scheme.into(),
        });
        self
    }

    /// The address this channel listens on.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint { &self.endpoint }

    /// Starts the listener. Calling it while running returns `true` without
    /// binding a second listener.
    pub fn start_server(&self) -> bool {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(ServerHandle::is_running) {
            tracing::debug!(endpoint = self.endpoint.name(), "command channel already running");
            return true;
        }

        let registry = Arc::clone(&self.registry);
        let server = match ServerHandle::spawn("command", &self.endpoint, move |connection| {
            serve_connection(&registry, connection);
        }) {
            Ok(server) => server,
            Err(err) => {
                tracing::warn!(
                    endpoint = self.endpoint.name(),
                    error = %err,
                    "failed to start command channel"
                );
                return false;
            }
        };

        *handle = Some(server);
        tracing::info!(endpoint = self.endpoint.name(), "command channel listening");

        if let Some(target) = &self.record {
            let record = EndpointRecord::for_current_process(self.endpoint.name(), &target.scheme);
            if let Err(err) = record.write(&target.state_dir) {
                tracing::warn!(error = %err, "failed to write endpoint record");
            }
        }

        true
    }

    /// Stops the listener and removes the endpoint record.
    pub fn stop_server(&self) {
        let Some(mut server) = self.handle.lock().take() else {
            return;
        };

        server.stop();
        if let Some(target) = &self.record {
            EndpointRecord::remove_own(&target.state_dir);
        }
        tracing::info!(endpoint = self.endpoint.name(), "command channel stopped");
    }
}

impl BackgroundService for CommandChannel {
    fn name(&self) -> &'static str { "command-channel" }

    fn start(&self) -> bool { self.start_server() }

    fn stop(&self) { self.stop_server(); }

    fn is_running(&self) -> bool { self.handle.lock().as_ref().is_some_and(ServerHandle::is_running) }
}

impl Drop for CommandChannel {
    fn drop(&mut self) { self.stop_server(); }
}

fn serve_connection(registry: &HandlerRegistry, connection: Connection) {
    let request_id = Uuid::now_v7();
    let span = tracing::debug_span!("command", %request_id);
    let _enter = span.enter();

    let mut reader = BufReader::new(connection);
    let response = match transport::read_json::<Message, _>(&mut reader, MAX_MESSAGE_BYTES) {
        Ok(message) => registry.handle(&message),
        Err(err) => {
            tracing::debug!(error = %err, "failed to read command message");
            Response::failure(format!("invalid message: {err}"))
        }
    };

    let reply = match serde_json::to_string(&response) {
        Ok(reply) if reply.len() < MAX_MESSAGE_BYTES => reply,
        Ok(_) => oversized_reply(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode reply");
            return;
        }
    };

    let mut connection = reader.into_inner();
    connection.extend(CONNECTION_WRITE_TIMEOUT);
    if let Err(err) = transport::write_frame(&mut connection, &reply) {
        tracing::debug!(error = %err, "failed to send reply");
    }
}

fn oversized_reply() -> String {
    tracing::warn!("handler result exceeds {MAX_MESSAGE_BYTES} bytes; replying with an error");
    format!(r#"{{"success":false,"error":"reply exceeds {MAX_MESSAGE_BYTES} bytes"}}"#)
}
