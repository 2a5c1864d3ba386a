//! Config flow confirmation over the Home Assistant REST API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// `type` of a flow step that created a config entry.
pub const CREATE_ENTRY: &str = "create_entry";

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(StatusCode),

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Reply to a flow step submission.
#[derive(Debug, Clone, Deserialize)]
struct FlowStepResponse {
    #[serde(rename = "type", default)]
    kind: String,

    #[serde(default)]
    step_id: Option<String>,

    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// What happened after submitting a flow's current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The flow finished and created config entry `entry_id`
    Created { entry_id: String },

    /// The flow wants more input before it can finish
    Pending { kind: String, step_id: Option<String> },
}

impl FlowStepResponse {
    fn into_outcome(self) -> FlowOutcome {
        let entry_id = self
            .result
            .as_ref()
            .and_then(|r| r.get("entry_id"))
            .and_then(serde_json::Value::as_str);

        match entry_id {
            Some(entry_id) if self.kind == CREATE_ENTRY => FlowOutcome::Created {
                entry_id: entry_id.to_string(),
            },
            _ => FlowOutcome::Pending {
                kind: self.kind,
                step_id: self.step_id,
            },
        }
    }
}

/// Client for `POST /config/config_entries/flow/{flow_id}`.
pub struct FlowClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl FlowClient {
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RegistrationError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Submit the current step of `flow_id` with an empty form.
    pub async fn confirm(&self, flow_id: &str) -> Result<FlowOutcome, RegistrationError> {
        let url = format!("{}/config/config_entries/flow/{}", self.api_base, flow_id);
        debug!("Confirming flow {} via {}", flow_id, url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RegistrationError::Status(status));
        }

        let bytes = response.bytes().await?;
        let step: FlowStepResponse = serde_json::from_slice(&bytes)?;
        Ok(step.into_outcome())
    }
}
