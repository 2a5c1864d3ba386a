use async_trait::async_trait;

use super::flow::FlowClient;
use super::flow::FlowOutcome;
use super::flow::RegistrationError;
use super::registry::DeviceEntry;
use super::registry::FlowEntry;
use super::session::ControlPlane;
use super::transport::Connector;

/// Operations the sync needs from the home automation platform.
///
/// The listing and update operations are best-effort: implementations log
/// their own failures and report them as an empty list or `false`.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn list_devices(&self) -> Vec<DeviceEntry>;

    async fn update_device_name(&self, device_id: &str, name: &str) -> bool;

    async fn list_flows(&self) -> Vec<FlowEntry>;

    async fn confirm_flow(&self, flow_id: &str) -> Result<FlowOutcome, RegistrationError>;
}

/// Home Assistant reached through its websocket and REST APIs.
pub struct HomeAssistant<C: Connector> {
    control: ControlPlane<C>,
    flows: FlowClient,
}

impl<C: Connector> HomeAssistant<C> {
    pub fn new(control: ControlPlane<C>, flows: FlowClient) -> Self {
        Self { control, flows }
    }
}

#[async_trait]
impl<C: Connector> Platform for HomeAssistant<C> {
    async fn list_devices(&self) -> Vec<DeviceEntry> {
        self.control.list_devices().await
    }

    async fn update_device_name(&self, device_id: &str, name: &str) -> bool {
        self.control.update_device_name(device_id, name).await
    }

    async fn list_flows(&self) -> Vec<FlowEntry> {
        self.control.list_flows().await
    }

    async fn confirm_flow(&self, flow_id: &str) -> Result<FlowOutcome, RegistrationError> {
        self.flows.confirm(flow_id).await
    }
}

/// Mock platform for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockPlatform {
    /// Successive registry snapshots; the last one repeats
    pub snapshots: std::sync::Mutex<Vec<Vec<DeviceEntry>>>,
    pub flows: Vec<FlowEntry>,
    /// flow_id -> outcome; missing flows answer with HTTP 500
    pub outcomes: std::collections::HashMap<String, FlowOutcome>,
    /// Device ids whose updates fail
    pub failing_updates: std::collections::HashSet<String>,

    pub updates: std::sync::Mutex<Vec<(String, String)>>,
    pub device_lists: std::sync::Mutex<usize>,
    pub flow_lists: std::sync::Mutex<usize>,
    pub confirmations: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(self, devices: Vec<DeviceEntry>) -> Self {
        self.snapshots.lock().unwrap().push(devices);
        self
    }

    pub fn with_flow(mut self, flow: FlowEntry, outcome: Option<FlowOutcome>) -> Self {
        if let Some(outcome) = outcome {
            self.outcomes.insert(flow.flow_id.clone(), outcome);
        }
        self.flows.push(flow);
        self
    }

    pub fn failing_update(mut self, device_id: &str) -> Self {
        self.failing_updates.insert(device_id.to_string());
        self
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn api_calls(&self) -> usize {
        *self.device_lists.lock().unwrap()
            + *self.flow_lists.lock().unwrap()
            + self.updates.lock().unwrap().len()
            + self.confirmations.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Platform for MockPlatform {
    async fn list_devices(&self) -> Vec<DeviceEntry> {
        *self.device_lists.lock().unwrap() += 1;
        let mut snapshots = self.snapshots.lock().unwrap();
        if snapshots.len() > 1 {
            snapshots.remove(0)
        } else {
            snapshots.first().cloned().unwrap_or_default()
        }
    }

    async fn update_device_name(&self, device_id: &str, name: &str) -> bool {
        self.updates
            .lock()
            .unwrap()
            .push((device_id.to_string(), name.to_string()));
        !self.failing_updates.contains(device_id)
    }

    async fn list_flows(&self) -> Vec<FlowEntry> {
        *self.flow_lists.lock().unwrap() += 1;
        self.flows.clone()
    }

    async fn confirm_flow(&self, flow_id: &str) -> Result<FlowOutcome, RegistrationError> {
        self.confirmations.lock().unwrap().push(flow_id.to_string());
        self.outcomes
            .get(flow_id)
            .cloned()
            .ok_or(RegistrationError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ))
    }
}
