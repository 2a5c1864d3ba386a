//! Confirm pending discovery flows for devices known to the cloud directory,
//! then name the devices they create.

use std::time::Duration;

use tracing::info;
use tracing::warn;

use crate::address;
use crate::cloud::Directory;
use crate::ha::FlowEntry;
use crate::ha::FlowOutcome;
use crate::ha::Platform;

#[derive(Debug, Clone)]
pub struct RegistrationOptions {
    /// Handler substrings (lowercase) that mark a flow as a candidate
    pub handler_markers: Vec<String>,

    /// Wait between entry creation and the registry lookup
    pub settle_delay: Duration,
}

impl Default for RegistrationOptions {
    fn default() -> Self {
        Self {
            handler_markers: vec!["switchbot".to_string(), "bluetooth".to_string()],
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl RegistrationOptions {
    /// True if the handler name contains any marker, ignoring case.
    pub fn is_candidate(&self, handler: &str) -> bool {
        let handler = handler.to_lowercase();
        self.handler_markers
            .iter()
            .any(|marker| handler.contains(&marker.to_lowercase()))
    }
}

/// Confirm every candidate flow whose unique id is in the directory.
///
/// Returns the number of flows that created a config entry. A failure on one
/// flow is logged and the next flow is tried.
pub async fn register_pending<P: Platform + ?Sized>(
    platform: &P,
    flows: &[FlowEntry],
    directory: &Directory,
    options: &RegistrationOptions,
) -> usize {
    let mut registered = 0;

    for flow in flows {
        let handler = flow.handler.as_deref().unwrap_or_default();
        if !options.is_candidate(handler) {
            continue;
        }

        let Some(unique_id) = flow.context.unique_id.as_deref().map(address::normalize) else {
            continue;
        };
        let Some(cloud_name) = directory.name(&unique_id) else {
            continue;
        };

        info!("Registering {} -> {}", unique_id, cloud_name);
        let entry_id = match platform.confirm_flow(&flow.flow_id).await {
            Ok(FlowOutcome::Created { entry_id }) => entry_id,
            Ok(FlowOutcome::Pending { kind, step_id }) => {
                info!(
                    "  flow {} needs another step ({}: {})",
                    flow.flow_id,
                    kind,
                    step_id.as_deref().unwrap_or("-")
                );
                continue;
            }
            Err(e) => {
                warn!("  registration request failed for flow {}: {}", flow.flow_id, e);
                continue;
            }
        };

        info!("  registered as entry {}, applying name", entry_id);
        registered += 1;

        // The new device shows up in the registry asynchronously
        tokio::time::sleep(options.settle_delay).await;

        let devices = platform.list_devices().await;
        match devices.iter().find(|d| d.belongs_to_entry(&entry_id)) {
            Some(device) => {
                if platform.update_device_name(&device.id, cloud_name).await {
                    info!("  named {}", cloud_name);
                } else {
                    warn!("  naming device {} failed", device.id);
                }
            }
            None => warn!("  no device found for entry {}", entry_id),
        }
    }

    registered
}
