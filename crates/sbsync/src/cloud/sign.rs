//! Request signing for the SwitchBot v1.1 API.
//!
//! Every request carries the account token, a millisecond timestamp, a fresh
//! nonce and `sign`: the uppercased base64 HMAC-SHA256 of
//! `token ++ t ++ nonce` keyed by the account secret.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::prelude::*;
use hmac::Hmac;
use hmac::Mac;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::InvalidHeaderValue;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Authentication headers for a single request. Never reuse across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub token: String,
    pub sign: String,
    pub nonce: String,
    pub t: String,
}

impl SignedHeaders {
    /// Sign with the current time and a random nonce.
    pub fn new(token: &str, secret: &str) -> Self {
        let t = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let nonce = uuid::Uuid::new_v4().to_string();
        Self::at(token, secret, &t.to_string(), &nonce)
    }

    /// Sign with an explicit timestamp and nonce.
    pub fn at(token: &str, secret: &str, t: &str, nonce: &str) -> Self {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(token.as_bytes());
        mac.update(t.as_bytes());
        mac.update(nonce.as_bytes());
        let sign = BASE64_STANDARD
            .encode(mac.finalize().into_bytes())
            .to_uppercase();

        Self {
            token: token.to_string(),
            sign,
            nonce: nonce.to_string(),
            t: t.to_string(),
        }
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&self.token)?);
        headers.insert("sign", HeaderValue::from_str(&self.sign)?);
        headers.insert("nonce", HeaderValue::from_str(&self.nonce)?);
        headers.insert("t", HeaderValue::from_str(&self.t)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}
