use std::collections::BTreeSet;

use tracing::debug;
use tracing::info;

use super::reconcile::reconcile;
use super::register::register_pending;
use super::register::RegistrationOptions;
use crate::cloud::CloudApiError;
use crate::cloud::CloudClient;
use crate::config::ConfigError;
use crate::config::Credentials;
use crate::config::Settings;
use crate::ha::ControlPlane;
use crate::ha::FlowClient;
use crate::ha::HomeAssistant;
use crate::ha::Platform;
use crate::ha::RegistrationError;
use crate::ha::WsConnector;

/// Failures that stop a run. Everything else is absorbed where it happens.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("SwitchBot API error: {0}")]
    Cloud(#[from] CloudApiError),

    #[error("Failed to create Home Assistant client: {0}")]
    Client(#[from] RegistrationError),
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub directory_size: usize,
    pub registry_size: usize,
    pub synced: usize,
    pub registered: usize,
}

/// One sync pass: cloud directory, then renames, then registrations.
pub struct Syncer<P: Platform> {
    cloud: CloudClient,
    platform: P,
    registration: RegistrationOptions,
}

impl<P: Platform> Syncer<P> {
    pub fn new(cloud: CloudClient, platform: P, registration: RegistrationOptions) -> Self {
        Self {
            cloud,
            platform,
            registration,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub async fn run(&self, credentials: &Credentials) -> Result<SyncReport, SyncError> {
        info!("[1/3] Fetching SwitchBot cloud devices");
        let directory = self
            .cloud
            .fetch_directory(&credentials.switchbot_token, &credentials.switchbot_secret)
            .await?;
        info!("Fetched {} devices", directory.len());

        info!("[2/3] Checking names of registered devices");
        let devices = self.platform.list_devices().await;
        info!("Home Assistant devices: {}", devices.len());
        for (i, device) in devices.iter().take(3).enumerate() {
            debug!(
                "  [{}] {} : {:?}",
                i,
                device.name.as_deref().unwrap_or("<unnamed>"),
                device.identifiers
            );
        }

        let synced = reconcile(&self.platform, &devices, &directory).await;
        info!("Synced {} device names", synced);

        info!("[3/3] Registering discovered devices");
        let flows = self.platform.list_flows().await;
        if !flows.is_empty() {
            let handlers: BTreeSet<&str> = flows
                .iter()
                .map(|f| f.handler.as_deref().unwrap_or("<none>"))
                .collect();
            info!("Pending flow handlers: {:?}", handlers);
        }

        let registered =
            register_pending(&self.platform, &flows, &directory, &self.registration).await;

        let report = SyncReport {
            directory_size: directory.len(),
            registry_size: devices.len(),
            synced,
            registered,
        };
        info!(
            "Done: {} renamed, {} registered",
            report.synced, report.registered
        );
        Ok(report)
    }
}

/// Load credentials, connect to both sides and run one sync pass.
pub async fn run(settings: &Settings) -> Result<SyncReport, SyncError> {
    let access_token = crate::config::supervisor_token(&settings.paths.token_env)?;
    let credentials = Credentials::from_file(&settings.paths.options)?;
    debug!("Loaded credentials from {}", settings.paths.options.display());

    let ha = &settings.home_assistant;
    let cloud = CloudClient::new(&settings.cloud.base_url, settings.cloud.timeout())?;
    let control = ControlPlane::new(
        WsConnector::new(&ha.websocket_url),
        access_token.clone(),
        ha.timeout(),
    );
    let flows = FlowClient::new(&ha.api_base, access_token, ha.timeout())?;

    let registration = RegistrationOptions {
        handler_markers: settings.discovery.handler_markers.clone(),
        settle_delay: ha.settle_delay(),
    };

    Syncer::new(cloud, HomeAssistant::new(control, flows), registration)
        .run(&credentials)
        .await
}
