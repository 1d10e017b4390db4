//! Optional bridge to an external scheduling application.
//!
//! The bridge is picked once at startup: if a bridge endpoint is configured and
//! something answers on it, the gateway talks to it through [`SocketBridge`];
//! otherwise it gets the no-op [`UnavailableBridge`]. Callers only see the
//! [`SchedulingBridge`] trait, so a missing bridge never changes their behavior.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::config::BridgeConfig;
use crate::platform::ipc::{self, Deadlines, Endpoint, Message};
use crate::routing::Params;

/// Time allowed for the startup capability probe.
const PROBE_BUDGET: Duration = Duration::from_millis(200);

/// Deadlines for bridge calls; shorter than command-channel defaults because
/// they run inline with dispatch.
const BRIDGE_DEADLINES: Deadlines = Deadlines {
    connect: Duration::from_millis(200),
    write: Duration::from_millis(200),
    reply: Duration::from_millis(500),
};

/// A dispatched draw command, as reported to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeEvent {
    pub domain: String,
    pub action: String,
    pub params: Params,
}

/// Capability-checked interface to the scheduling application.
pub trait SchedulingBridge: Send + Sync {
    /// Whether a live bridge was found at startup.
    fn is_available(&self) -> bool;

    /// Reports an event. Failures are logged and otherwise ignored.
    fn notify(&self, event: &BridgeEvent);

    /// Fetches the external application's state, if it can be reached.
    fn query_state(&self) -> Option<Value>;

    /// State summary returned by the `bridge.state` command.
    fn describe(&self) -> Value {
        if !self.is_available() {
            return json!({ "available": false });
        }
        json!({ "available": true, "state": self.query_state() })
    }
}

/// Bridge used when no scheduling application is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBridge;

impl SchedulingBridge for UnavailableBridge {
    fn is_available(&self) -> bool { false }

    fn notify(&self, _event: &BridgeEvent) {}

    fn query_state(&self) -> Option<Value> { None }
}

/// Bridge speaking the command-channel envelope to a local endpoint.
///
/// Sends `notify` messages with the event as payload and `state` messages
/// whose reply `result` is the external state.
#[derive(Debug, Clone)]
pub struct SocketBridge {
    endpoint: Endpoint,
}

impl SocketBridge {
    /// Creates a bridge talking to `endpoint`.
    #[must_use]
    pub const fn new(endpoint: Endpoint) -> Self { Self { endpoint } }

    fn call(&self, message: &Message) -> Option<Value> {
        match ipc::request(&self.endpoint, message, BRIDGE_DEADLINES) {
            Ok(response) if response.success => Some(response.result.unwrap_or(Value::Null)),
            Ok(response) => {
                tracing::debug!(
                    kind = %message.kind,
                    error = response.error.as_deref().unwrap_or("unknown"),
                    "bridge refused message"
                );
                None
            }
            Err(err) => {
                tracing::debug!(kind = %message.kind, error = %err, "bridge unreachable");
                None
            }
        }
    }
}

impl SchedulingBridge for SocketBridge {
    fn is_available(&self) -> bool { true }

    fn notify(&self, event: &BridgeEvent) {
        let payload = match serde_json::to_value(event) {
            Ok(Value::Object(payload)) => payload,
            Ok(other) => {
                tracing::warn!(value = %other, "bridge event did not encode as an object");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode bridge event");
                return;
            }
        };

        if self.call(&Message::new("notify", payload)).is_none() {
            tracing::debug!(domain = %event.domain, action = %event.action, "bridge notification not delivered");
        }
    }

    fn query_state(&self) -> Option<Value> { self.call(&Message::new("state", Map::new())) }
}

/// Chooses the bridge implementation for this process.
#[must_use]
pub fn probe(config: &BridgeConfig, socket_dir: impl Into<PathBuf>) -> Arc<dyn SchedulingBridge> {
    let Some(name) = config.endpoint.as_deref() else {
        tracing::debug!("no scheduling bridge configured");
        return Arc::new(UnavailableBridge);
    };

    let endpoint = Endpoint::new(name, socket_dir);
    if ipc::probe(&endpoint, PROBE_BUDGET) {
        tracing::info!(endpoint = name, "scheduling bridge available");
        Arc::new(SocketBridge::new(endpoint))
    } else {
        tracing::info!(endpoint = name, "scheduling bridge not reachable; running without it");
        Arc::new(UnavailableBridge)
    }
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;
    use std::sync::mpsc;
    use std::time::Instant;

    use super::*;
    use crate::platform::ipc::{ServerHandle, transport};

    fn event() -> BridgeEvent {
        let mut params = Params::new();
        params.insert_first("count", "3");
        BridgeEvent {
            domain: "rollcall".to_string(),
            action: "start".to_string(),
            params,
        }
    }

    #[test]
    fn test_socket_bridge_sends_event_as_notify_payload() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::new(format!("bridge-{}", uuid::Uuid::now_v7().simple()), dir.path());
        let (tx, rx) = mpsc::channel();
        let tx = parking_lot::Mutex::new(tx);

        let _server = ServerHandle::spawn("bridge-test", &endpoint, move |connection| {
            let mut reader = BufReader::new(connection);
            if let Ok(message) = transport::read_json::<Message, _>(&mut reader, 4096) {
                let _ = tx.lock().send(message);
            }
            let _ = transport::write_frame(&mut reader.into_inner(), r#"{"success":true}"#);
        })
        .unwrap();

        SocketBridge::new(endpoint).notify(&event());

        let message = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(message.kind, "notify");
        assert_eq!(message.payload["domain"], "rollcall");
        assert_eq!(message.payload["params"]["count"], "3");
    }

    #[test]
    fn test_socket_bridge_notify_gives_up_when_peer_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::new(format!("gone-{}", uuid::Uuid::now_v7().simple()), dir.path());

        let started = Instant::now();
        SocketBridge::new(endpoint).notify(&event());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_unconfigured_bridge_is_unavailable() {
        let bridge = probe(&BridgeConfig::default(), std::env::temp_dir());
        assert!(!bridge.is_available());
        assert_eq!(bridge.describe(), json!({ "available": false }));
    }

    #[test]
    fn test_unreachable_bridge_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            endpoint: Some(format!("bridge-{}", uuid::Uuid::now_v7())),
        };
        assert!(!probe(&config, dir.path()).is_available());
    }

    #[test]
    fn test_unavailable_bridge_ignores_events() {
        let bridge = UnavailableBridge;
        bridge.notify(&event());
        assert_eq!(bridge.query_state(), None);
    }
}
