//! Wire types for the command channel.
//!
//! A request is one JSON object `{"type": ..., "payload": {...}}`; the reply is
//! `{"success": bool, "result"?: any, "error"?: string}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Error returned for a message whose `type` has no handler.
pub const UNKNOWN_TYPE_ERROR: &str = "unknown type";

/// Error returned when credential verification rejects a message.
pub const VERIFICATION_FAILED_ERROR: &str = "security verification failed";

/// Built-in message type forwarding a scheme URL to the dispatcher.
pub const URL_TYPE: &str = "url";

/// Built-in message type reporting gateway liveness.
pub const PING_TYPE: &str = "ping";

/// Built-in message type reporting the scheduling bridge state.
pub const BRIDGE_STATE_TYPE: &str = "bridge.state";

/// A command channel request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Selects the handler.
    #[serde(rename = "type")]
    pub kind: String,
    /// Handler-specific data.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Message {
    /// Creates a message of `kind` with the given payload.
    pub fn new(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Creates a `url` message, optionally carrying a verification token.
    #[must_use]
    pub fn url(url: &str, token: Option<&str>) -> Self {
        let mut payload = Map::new();
        payload.insert("url".to_string(), Value::String(url.to_string()));
        if let Some(token) = token {
            payload.insert("verification".to_string(), json!({ "token": token }));
        }
        Self::new(URL_TYPE, payload)
    }
}

/// A command channel reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the handler ran and succeeded.
    pub success: bool,
    /// Handler result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// A successful reply carrying `result`.
    #[must_use]
    pub const fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// A failed reply carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}
