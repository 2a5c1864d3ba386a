//! Device registry and config flow records, as returned by Home Assistant.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

/// An entry in the Home Assistant device registry.
///
/// Only the fields used for matching and naming are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub id: String,

    /// Name set by the integration
    #[serde(default)]
    pub name: Option<String>,

    /// Name set by the user; takes precedence over `name`
    #[serde(default)]
    pub name_by_user: Option<String>,

    /// `(domain, value)` pairs identifying the device within its integration
    #[serde(default)]
    pub identifiers: Vec<Vec<serde_json::Value>>,

    /// `(connection type, value)` pairs, e.g. `("bluetooth", "AA:BB:...")`
    #[serde(default)]
    pub connections: Vec<Vec<serde_json::Value>>,

    #[serde(default)]
    pub config_entries: Vec<String>,
}

impl DeviceEntry {
    /// The name Home Assistant currently displays for this device.
    pub fn current_name(&self) -> Option<&str> {
        self.name_by_user
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.name.as_deref())
    }

    pub fn belongs_to_entry(&self, entry_id: &str) -> bool {
        self.config_entries.iter().any(|e| e == entry_id)
    }
}

/// A config flow that has not finished yet.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowEntry {
    pub flow_id: String,

    #[serde(default)]
    pub handler: Option<String>,

    #[serde(default)]
    pub step_id: Option<String>,

    #[serde(default)]
    pub context: FlowContext,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowContext {
    #[serde(default)]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub source: Option<String>,
}

/// Decode a JSON array element by element, skipping elements that do not fit `T`.
pub fn decode_list<T: DeserializeOwned>(what: &str, value: serde_json::Value) -> Vec<T> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => return Vec::new(),
        other => {
            warn!("[{}] Expected a list, got: {}", what, other);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("[{}] Skipping malformed record: {}", what, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_device_entry_from_registry_json() {
        let device: DeviceEntry = serde_json::from_value(json!({
            "id": "dev1",
            "name": "Sensor 1",
            "name_by_user": null,
            "identifiers": [["switchbot", "AA:BB:CC:DD:EE:FF"]],
            "connections": [["bluetooth", "AA:BB:CC:DD:EE:FF"]],
            "config_entries": ["e1"],
            "manufacturer": "SwitchBot",
            "model": "Meter"
        }))
        .unwrap();

        assert_eq!(device.current_name(), Some("Sensor 1"));
        assert!(device.belongs_to_entry("e1"));
        assert!(!device.belongs_to_entry("e2"));
        assert_eq!(device.identifiers.len(), 1);
    }

    #[test]
    fn test_current_name_prefers_user_name() {
        let device: DeviceEntry = serde_json::from_value(json!({
            "id": "dev1",
            "name": "Sensor 1",
            "name_by_user": "Kitchen"
        }))
        .unwrap();
        assert_eq!(device.current_name(), Some("Kitchen"));
    }

    #[test]
    fn test_current_name_ignores_empty_user_name() {
        let device: DeviceEntry = serde_json::from_value(json!({
            "id": "dev1",
            "name": "Sensor 1",
            "name_by_user": ""
        }))
        .unwrap();
        assert_eq!(device.current_name(), Some("Sensor 1"));
    }

    #[test]
    fn test_flow_entry() {
        let flow: FlowEntry = serde_json::from_value(json!({
            "flow_id": "f1",
            "handler": "switchbot",
            "step_id": "confirm",
            "context": {"source": "bluetooth", "unique_id": "aa:bb:cc:dd:ee:ff"}
        }))
        .unwrap();
        assert_eq!(flow.context.unique_id.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(flow.handler.as_deref(), Some("switchbot"));
    }

    #[test]
    fn test_decode_list_skips_malformed() {
        let devices: Vec<DeviceEntry> = decode_list(
            "devices",
            json!([{"id": "dev1"}, {"name": "no id"}, {"id": "dev2"}]),
        );
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["dev1", "dev2"]);
    }

    #[test]
    fn test_decode_list_non_array() {
        let flows: Vec<FlowEntry> = decode_list("flows", json!({"flow_id": "f1"}));
        assert!(flows.is_empty());
        let flows: Vec<FlowEntry> = decode_list("flows", serde_json::Value::Null);
        assert!(flows.is_empty());
    }
}
