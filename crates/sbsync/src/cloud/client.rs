use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::InvalidHeaderValue;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::sign::SignedHeaders;
use crate::address;

/// `statusCode` the SwitchBot API reports on success.
const API_SUCCESS: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum CloudApiError {
    #[error("Failed to build request headers: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(StatusCode),

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevicesResponse {
    status_code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    body: Option<DevicesBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevicesBody {
    #[serde(default)]
    device_list: Vec<CloudDevice>,
    #[serde(default)]
    remote_infrared_commands: Vec<CloudDevice>,
}

/// A device as listed by the cloud, physical or infrared-remote.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDevice {
    pub device_id: String,
    pub device_name: String,
}

/// Normalized hardware address -> canonical device name.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    names: HashMap<String, String>,
}

impl Directory {
    /// Build from cloud device records. Later records win on duplicate addresses.
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a CloudDevice>) -> Self {
        let mut names = HashMap::new();
        for device in devices {
            names.insert(
                address::normalize(&device.device_id),
                device.device_name.clone(),
            );
        }
        Self { names }
    }

    pub fn name(&self, normalized: &str) -> Option<&str> {
        self.names.get(normalized).map(String::as_str)
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.names.contains_key(normalized)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Directory {
    /// Collect already-normalized pairs.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Client for the SwitchBot cloud device list.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
}

impl CloudClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CloudApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch every device on the account and build the address -> name directory.
    pub async fn fetch_directory(
        &self,
        token: &str,
        secret: &str,
    ) -> Result<Directory, CloudApiError> {
        let url = format!("{}/v1.1/devices", self.base_url);
        let headers = SignedHeaders::new(token, secret).to_header_map()?;

        debug!("Fetching cloud device list from {}", url);
        let response = self.http.get(&url).headers(headers).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CloudApiError::Status(status));
        }

        let bytes = response.bytes().await?;
        let parsed: DevicesResponse = serde_json::from_slice(&bytes)?;

        if let Some(code) = parsed.status_code {
            if code != API_SUCCESS {
                return Err(CloudApiError::Api {
                    code,
                    message: parsed.message.unwrap_or_default(),
                });
            }
        }

        let body = parsed.body.unwrap_or_default();
        debug!(
            "Cloud reported {} devices and {} infrared remotes",
            body.device_list.len(),
            body.remote_infrared_commands.len()
        );

        Ok(Directory::from_devices(
            body.device_list
                .iter()
                .chain(body.remote_infrared_commands.iter()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::header;
    use wiremock::matchers::header_exists;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    use super::*;

    fn client(server: &MockServer) -> CloudClient {
        CloudClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_directory_merges_both_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/devices"))
            .and(header("Authorization", "tok"))
            .and(header_exists("sign"))
            .and(header_exists("nonce"))
            .and(header_exists("t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "statusCode": 100,
                "message": "success",
                "body": {
                    "deviceList": [
                        {"deviceId": "AA:BB:CC:DD:EE:FF", "deviceName": "Living Room Sensor"},
                        {"deviceId": "112233445566", "deviceName": "Curtain"}
                    ],
                    "remoteInfraredCommands": [
                        {"deviceId": "112233445566", "deviceName": "TV Remote"}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let directory = client(&server).fetch_directory("tok", "sec").await.unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.name("aabbccddeeff"), Some("Living Room Sensor"));
        // Infrared remotes are processed last and win on duplicates
        assert_eq!(directory.name("112233445566"), Some("TV Remote"));
    }

    #[tokio::test]
    async fn test_fetch_directory_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).fetch_directory("tok", "sec").await.unwrap_err();
        assert!(matches!(err, CloudApiError::Status(StatusCode::UNAUTHORIZED)));
    }

    #[tokio::test]
    async fn test_fetch_directory_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_directory("tok", "sec").await.unwrap_err();
        assert!(matches!(err, CloudApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_directory_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "statusCode": 190,
                "message": "wrong sign",
                "body": {}
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_directory("tok", "sec").await.unwrap_err();
        match err {
            CloudApiError::Api { code, message } => {
                assert_eq!(code, 190);
                assert_eq!(message, "wrong sign");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_directory_from_pairs() {
        let directory: Directory = [("aabbccddeeff", "Living Room Sensor")].into_iter().collect();
        assert!(directory.contains("aabbccddeeff"));
        assert!(!directory.contains("AA:BB:CC:DD:EE:FF"));
        assert!(!directory.is_empty());
    }
}
