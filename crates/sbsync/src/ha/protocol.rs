//! Home Assistant websocket API message definitions.
//!
//! The server speaks first (`auth_required`), the client answers with
//! `auth`, and after `auth_ok` every command carries a client-chosen integer
//! `id` that the matching `result` message echoes back. Unrelated messages
//! (events, results for other ids) may arrive in between and are skipped.

use serde::Deserialize;
use serde::Serialize;

/// `type` of a successful authentication reply.
pub const AUTH_OK: &str = "auth_ok";

/// Messages sent before authentication completes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMessage {
    Auth { access_token: String },
}

/// Commands issued after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Command {
    /// List discovery flows that are still in progress
    #[serde(rename = "config_entries/flow/progress")]
    FlowProgress,

    /// List every device in the device registry
    #[serde(rename = "config/device_registry/list")]
    DeviceRegistryList,

    /// Set the user-facing name of a device
    #[serde(rename = "config/device_registry/update")]
    DeviceRegistryUpdate {
        device_id: String,
        name_by_user: String,
    },
}

impl Command {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Command::FlowProgress => "flows",
            Command::DeviceRegistryList => "devices",
            Command::DeviceRegistryUpdate { .. } => "update",
        }
    }
}

/// A command with its correlation id, as it goes on the wire.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub command: &'a Command,
}

/// Any message received from the server.
///
/// Only the fields this client acts on are decoded; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Incoming {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    id: Option<serde_json::Value>,

    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub result: serde_json::Value,

    #[serde(default)]
    pub error: Option<ErrorInfo>,

    /// Reason given with `auth_invalid`
    #[serde(default)]
    pub message: Option<String>,
}

impl Incoming {
    /// The correlation id, if the message carries an integer one.
    pub fn id(&self) -> Option<u64> {
        self.id.as_ref().and_then(serde_json::Value::as_u64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Authentication rejected")]
    AuthRejected,

    #[error("Connection closed by server")]
    Closed,

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

pub type Result<T> = std::result::Result<T, ControlPlaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_message_wire_format() {
        let msg = AuthMessage::Auth {
            access_token: "secret".to_string(),
        };
        insta::assert_snapshot!(
            serde_json::to_string(&msg).unwrap(),
            @r#"{"type":"auth","access_token":"secret"}"#
        );
    }

    #[test]
    fn test_request_wire_format() {
        let list = Command::DeviceRegistryList;
        insta::assert_snapshot!(
            serde_json::to_string(&Request { id: 7, command: &list }).unwrap(),
            @r#"{"id":7,"type":"config/device_registry/list"}"#
        );

        let update = Command::DeviceRegistryUpdate {
            device_id: "dev1".to_string(),
            name_by_user: "Living Room Sensor".to_string(),
        };
        insta::assert_snapshot!(
            serde_json::to_string(&Request { id: 8, command: &update }).unwrap(),
            @r#"{"id":8,"type":"config/device_registry/update","device_id":"dev1","name_by_user":"Living Room Sensor"}"#
        );
    }

    #[test]
    fn test_incoming_result() {
        let msg: Incoming = serde_json::from_str(
            r#"{"id": 42, "type": "result", "success": true, "result": [1, 2]}"#,
        )
        .unwrap();
        assert_eq!(msg.id(), Some(42));
        assert_eq!(msg.kind, "result");
        assert!(msg.success);
        assert_eq!(msg.result, serde_json::json!([1, 2]));
    }

    #[test]
    fn test_incoming_without_id() {
        let msg: Incoming =
            serde_json::from_str(r#"{"type": "auth_required", "ha_version": "2024.1.0"}"#).unwrap();
        assert_eq!(msg.id(), None);
        assert!(!msg.success);
        assert!(msg.result.is_null());
    }

    #[test]
    fn test_incoming_error() {
        let msg: Incoming = serde_json::from_str(
            r#"{"id": 1, "type": "result", "success": false,
                "error": {"code": "not_found", "message": "Device not found"}}"#,
        )
        .unwrap();
        assert!(!msg.success);
        assert_eq!(msg.error.unwrap().to_string(), "not_found: Device not found");
    }
}
