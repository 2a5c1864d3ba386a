//! Rename registry devices whose name differs from the cloud directory.

use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::address;
use crate::cloud::Directory;
use crate::ha::DeviceEntry;
use crate::ha::Platform;

/// Find the directory address a device refers to.
///
/// Identifier tuples are scanned before connection tuples; within each, the
/// first string component that normalizes to a directory address wins.
pub fn match_address(device: &DeviceEntry, directory: &Directory) -> Option<String> {
    scan_tuples(&device.identifiers, directory).or_else(|| scan_tuples(&device.connections, directory))
}

fn scan_tuples(tuples: &[Vec<Value>], directory: &Directory) -> Option<String> {
    tuples
        .iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(address::normalize)
        .find(|candidate| address::is_hardware_address(candidate) && directory.contains(candidate))
}

/// Rename every matched device whose current name differs from the directory.
///
/// Returns the number of successful renames.
pub async fn reconcile<P: Platform + ?Sized>(
    platform: &P,
    devices: &[DeviceEntry],
    directory: &Directory,
) -> usize {
    let mut synced = 0;

    for device in devices {
        let Some(mac) = match_address(device, directory) else {
            continue;
        };
        let Some(cloud_name) = directory.name(&mac) else {
            continue;
        };

        let current_name = device.current_name();
        if current_name == Some(cloud_name) {
            debug!("[{}] Already named {:?}", device.id, cloud_name);
            continue;
        }

        info!(
            "Renaming {} -> {} (MAC: {})",
            current_name.unwrap_or("<unnamed>"),
            cloud_name,
            mac
        );
        if platform.update_device_name(&device.id, cloud_name).await {
            info!("  renamed");
            synced += 1;
        } else {
            warn!("  rename failed for device {}", device.id);
        }
    }

    synced
}
