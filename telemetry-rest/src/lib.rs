//! Minimal REST client for homestead telemetry backends.
//!
//! This crate provides a focused client for the telemetry poll contract:
//! - A health probe to verify the backend is reachable
//! - Batched key polling returning the latest reading per key
//! - Typed errors; no retry logic (callers simply poll again on the
//!   next scheduled interval)
//!
//! The backend is optional by design: the twin runs air-gapped with mock
//! data when no endpoint is configured, so every failure here is local
//! and recoverable.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur when talking to a telemetry backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Backend URL not configured")]
    NoEndpoint,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Telemetry backend client.
///
/// Wraps a REST-like endpoint exposing `GET /health` and
/// `GET /telemetry?keys=a,b,c`. The poll response is a flat JSON object
/// mapping each known key to its latest numeric reading; unknown keys
/// are simply absent from the map.
#[derive(Clone)]
pub struct TelemetryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Health probe response from the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendHealth {
    /// Backend service status string (e.g. "ok").
    pub status: String,

    /// Backend software version, if reported.
    #[serde(default)]
    pub version: Option<String>,
}

impl TelemetryClient {
    /// Create a new client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .connect_timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: trim_trailing_slash(base_url.into()),
            api_key: None,
        }
    }

    /// Create a client from the `TWIN_TELEMETRY_URL` environment variable.
    ///
    /// Picks up `TWIN_TELEMETRY_KEY` as the credential when set.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("TWIN_TELEMETRY_URL").map_err(|_| Error::NoEndpoint)?;
        let mut client = Self::new(base_url);
        if let Ok(key) = std::env::var("TWIN_TELEMETRY_KEY") {
            client = client.with_api_key(key);
        }
        Ok(client)
    }

    /// Attach an API key sent as the `x-api-key` header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe the backend health endpoint.
    pub async fn connect(&self) -> Result<BackendHealth, Error> {
        let response = self
            .request(&format!("{}/health", self.base_url))?
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        response
            .json::<BackendHealth>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    /// Poll the latest readings for a set of keys.
    ///
    /// Keys the backend does not know are absent from the returned map.
    pub async fn poll(&self, keys: &[String]) -> Result<HashMap<String, f64>, Error> {
        let url = format!(
            "{}/telemetry?keys={}",
            self.base_url,
            keys_query(keys)
        );

        let response = self
            .request(&url)?
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        response
            .json::<HashMap<String, f64>>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    fn request(&self, url: &str) -> Result<reqwest::RequestBuilder, Error> {
        let mut builder = self.client.get(url);
        if let Some(key) = &self.api_key {
            if key.contains(['\r', '\n']) {
                return Err(Error::Config("API key contains line breaks".to_string()));
            }
            builder = builder.header("x-api-key", key);
        }
        Ok(builder)
    }
}

/// Join keys into a comma-separated query value.
fn keys_query(keys: &[String]) -> String {
    keys.join(",")
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
