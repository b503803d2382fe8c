//! Thin HTTP client for the pindrift API
//!
//! The scan and snapshot commands do no analysis of their own; they post to a
//! running pindrift server and render what comes back. Every endpoint answers
//! with the `{success, data?, error?}` envelope, so error extraction is
//! shared across calls.

use crate::config::Config;
use crate::snapshot::{SnapshotRequest, SnapshotResponse};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Request timeout for API calls; scans block on a model round trip, so this
/// sits well above the server's own AI timeout.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Errors surfaced by the API client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached at all
    #[error("Cannot reach pindrift server at {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with an error envelope
    #[error("{0}")]
    Api(String),

    /// The response body was not the expected envelope
    #[error("Unexpected response from server: {0}")]
    Malformed(String),
}

/// HTTP client for a pindrift server
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: Client,
}

impl ApiClient {
    /// Creates a client for the given server base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    /// Creates a client pointed at `PINDRIFT_API_URL`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_url.clone())
    }

    /// The server base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests an analysis of a GitHub repository
    ///
    /// Returns the full success envelope; the analysis document sits under
    /// `data`. Callers that want typed access deserialize that field.
    pub async fn analyze(&self, repo_url: &str) -> Result<Value, ClientError> {
        let body = json!({ "repoUrl": repo_url });
        self.post_envelope("/v1/analyze-repo", &body).await
    }

    /// Requests an analysis of locally read manifest files
    ///
    /// `files` pairs each filename with its content; `python_version` is the
    /// locally sniffed version, if any.
    pub async fn analyze_local(
        &self,
        files: &[(String, String)],
        python_version: Option<&str>,
    ) -> Result<Value, ClientError> {
        let local_files: Vec<Value> = files
            .iter()
            .map(|(name, content)| json!({ "name": name, "content": content }))
            .collect();

        let mut body = json!({ "localFiles": local_files, "isLocal": true });
        if let Some(version) = python_version {
            body["pythonVersion"] = json!(version);
        }

        self.post_envelope("/v1/analyze-repo", &body).await
    }

    /// Requests a corrected dependency snapshot for an analyzed repository
    pub async fn generate_snapshot(
        &self,
        request: &SnapshotRequest,
    ) -> Result<SnapshotResponse, ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::Malformed(format!("request serialization: {}", e)))?;
        let envelope = self.post_envelope("/v1/generate-snapshot", &body).await?;

        serde_json::from_value(envelope).map_err(|e| ClientError::Malformed(e.to_string()))
    }

    async fn post_envelope(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                url: self.base_url.clone(),
                message: transport_message(&e),
            })?;

        let status = response.status().as_u16();
        let envelope: Value = match response.json().await {
            Ok(value) => value,
            Err(e) if (200..300).contains(&status) => {
                return Err(ClientError::Malformed(e.to_string()))
            }
            // Non-JSON error bodies (proxies, panics) still get a message.
            Err(_) => return Err(ClientError::Api(format!("API returned {}", status))),
        };

        check_envelope(status, envelope)
    }
}

/// Validates the `{success, data?, error?}` envelope against the HTTP status
///
/// Error responses carry their message in `error`; a 2xx with `success:false`
/// does too. Anything else passes through untouched.
fn check_envelope(status: u16, envelope: Value) -> Result<Value, ClientError> {
    if !(200..300).contains(&status) {
        let message = envelope
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("API returned {}", status));
        return Err(ClientError::Api(message));
    }

    if envelope.get("success").and_then(Value::as_bool) != Some(true) {
        let message = envelope
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Analysis failed")
            .to_string();
        return Err(ClientError::Api(message));
    }

    Ok(envelope)
}

fn transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out after {}s", REQUEST_TIMEOUT_SECS)
    } else if error.is_connect() {
        "connection refused".to_string()
    } else {
        error.to_string()
    }
}
