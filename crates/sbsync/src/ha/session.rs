//! Command/response exchange over the Home Assistant websocket API.
//!
//! Every operation runs its own short-lived connection:
//!
//! 1. connect
//! 2. drain the server greeting (`auth_required`)
//! 3. authenticate
//! 4. send one command
//! 5. read until the result with the matching id arrives
//! 6. close
//!
//! Failures never escape the public operations: they are logged and turned
//! into an empty list or `false` so the sync can carry on with the next item.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::warn;

use super::protocol::AuthMessage;
use super::protocol::Command;
use super::protocol::ControlPlaneError;
use super::protocol::Incoming;
use super::protocol::Request;
use super::protocol::Result;
use super::protocol::AUTH_OK;
use super::registry::decode_list;
use super::registry::DeviceEntry;
use super::registry::FlowEntry;
use super::transport::Connector;
use super::transport::Transport;

/// Monotonic request ids, seeded from the clock so ids differ between runs.
#[derive(Debug)]
pub struct RequestIds(AtomicU64);

impl RequestIds {
    pub fn new() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::starting_at(ms % 1_000_000)
    }

    pub fn starting_at(first: u64) -> Self {
        // Home Assistant rejects id 0
        Self(AtomicU64::new(first.max(1)))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a command that got a matching reply.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub success: bool,
    pub result: serde_json::Value,
}

/// Client for the Home Assistant websocket API.
pub struct ControlPlane<C: Connector> {
    connector: C,
    access_token: String,
    ids: RequestIds,
    timeout: Duration,
}

impl<C: Connector> ControlPlane<C> {
    pub fn new(connector: C, access_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            connector,
            access_token: access_token.into(),
            ids: RequestIds::new(),
            timeout,
        }
    }

    pub fn with_ids(mut self, ids: RequestIds) -> Self {
        self.ids = ids;
        self
    }

    #[cfg(test)]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Fetch every device in the registry. Empty on any failure.
    pub async fn list_devices(&self) -> Vec<DeviceEntry> {
        self.fetch_list(Command::DeviceRegistryList).await
    }

    /// Fetch every config flow in progress. Empty on any failure.
    pub async fn list_flows(&self) -> Vec<FlowEntry> {
        self.fetch_list(Command::FlowProgress).await
    }

    /// Set a device's user-facing name. `false` on any failure.
    pub async fn update_device_name(&self, device_id: &str, name: &str) -> bool {
        let command = Command::DeviceRegistryUpdate {
            device_id: device_id.to_string(),
            name_by_user: name.to_string(),
        };
        match self.call(&command).await {
            Ok(reply) if reply.success => true,
            Ok(_) => false,
            Err(e) => {
                warn!("[{}] {}", command.name(), e);
                false
            }
        }
    }

    async fn fetch_list<T: DeserializeOwned>(&self, command: Command) -> Vec<T> {
        match self.call(&command).await {
            Ok(reply) if reply.success => decode_list(command.name(), reply.result),
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!("[{}] {}", command.name(), e);
                Vec::new()
            }
        }
    }

    /// Run one command on a fresh, authenticated connection.
    pub async fn call(&self, command: &Command) -> Result<CommandResult> {
        let mut transport = self.connector.connect().await?;
        let outcome = self.exchange(&mut transport, command).await;
        if let Err(e) = transport.close().await {
            debug!("[{}] Error closing connection: {}", command.name(), e);
        }
        outcome
    }

    async fn exchange(&self, transport: &mut C::Transport, command: &Command) -> Result<CommandResult> {
        // The greeting carries nothing we need
        let greeting = self.recv(transport, "greeting").await?;
        debug!("[{}] Server greeting: {}", command.name(), greeting.kind);

        if !authenticate(transport, &self.access_token, self.timeout).await? {
            return Err(ControlPlaneError::AuthRejected);
        }

        let reply = send_command(transport, self.ids.next(), command, self.timeout).await?;
        if !reply.success {
            match &reply.error {
                Some(error) => warn!("[{}] Command failed: {}", command.name(), error),
                None => warn!("[{}] Command failed", command.name()),
            }
        }
        Ok(CommandResult {
            success: reply.success,
            result: reply.result,
        })
    }

    async fn recv(&self, transport: &mut C::Transport, what: &'static str) -> Result<Incoming> {
        recv_message(transport, what, self.timeout).await
    }
}

async fn recv_message<T: Transport + ?Sized>(
    transport: &mut T,
    what: &'static str,
    timeout: Duration,
) -> Result<Incoming> {
    let text = tokio::time::timeout(timeout, transport.recv_text())
        .await
        .map_err(|_| ControlPlaneError::Timeout(what))??;
    Ok(serde_json::from_str(&text)?)
}

/// Send the access token and read exactly one reply.
///
/// Returns `Ok(false)` when the server answers with anything but `auth_ok`.
pub async fn authenticate<T: Transport + ?Sized>(
    transport: &mut T,
    access_token: &str,
    timeout: Duration,
) -> Result<bool> {
    let auth = AuthMessage::Auth {
        access_token: access_token.to_string(),
    };
    transport.send_text(serde_json::to_string(&auth)?).await?;

    let reply = recv_message(transport, "auth reply", timeout).await?;
    if reply.kind == AUTH_OK {
        Ok(true)
    } else {
        warn!(
            "Authentication failed: {} {}",
            reply.kind,
            reply.message.as_deref().unwrap_or_default()
        );
        Ok(false)
    }
}

/// Send `command` under `id` and wait for the reply carrying the same id.
///
/// Messages for other ids are discarded. A failed or malformed read aborts.
pub async fn send_command<T: Transport + ?Sized>(
    transport: &mut T,
    id: u64,
    command: &Command,
    timeout: Duration,
) -> Result<Incoming> {
    let request = Request { id, command };
    transport.send_text(serde_json::to_string(&request)?).await?;

    loop {
        let message = recv_message(transport, "command reply", timeout).await?;
        if message.id() == Some(id) {
            return Ok(message);
        }
        debug!(
            "[{}] Discarding unrelated message ({}, id {:?})",
            command.name(),
            message.kind,
            message.id()
        );
    }
}
