//! OpenAI-compatible HTTP client for analysis inference
//!
//! This module provides the HTTP client used for dependency analysis. It
//! speaks the OpenAI chat-completions wire format, which covers hosted
//! gateways as well as local services like Ollama and LM Studio, so one
//! client serves every deployment.
//!
//! # Example
//!
//! ```no_run
//! use pindrift::ai::backend::{ChatRequest, CompletionBackend};
//! use pindrift::ai::gateway::GatewayClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GatewayClient::new(
//!     "http://localhost:11434".to_string(),
//!     "qwen2.5-coder:7b".to_string(),
//! );
//!
//! if client.health_check().await? {
//!     let reply = client
//!         .complete(ChatRequest::new("You are helpful.", "Say hi"))
//!         .await?;
//!     println!("{}", reply);
//! }
//! # Ok(())
//! # }
//! ```

use crate::ai::backend::{BackendError, ChatRequest, CompletionBackend};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default request timeout for API calls
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Chat-completions client for hosted and local inference
///
/// # Configuration
///
/// - **endpoint**: API base URL (e.g., "http://localhost:11434" for Ollama)
/// - **model**: Model name (e.g., "qwen2.5-coder:7b")
/// - **api_key**: Bearer token, omitted for local services
/// - **timeout**: Request timeout duration
///
/// # Thread Safety
///
/// This client is thread-safe and can be shared across threads using `Arc`.
pub struct GatewayClient {
    /// API endpoint URL
    endpoint: String,

    /// Model name to use for inference
    model: String,

    /// Bearer token for authenticated gateways
    api_key: Option<String>,

    /// Shared HTTP client with connection pooling
    http_client: Client,

    /// Request timeout duration
    timeout: Duration,
}

impl GatewayClient {
    /// Creates a new client with the default timeout and no API key
    pub fn new(endpoint: String, model: String) -> Self {
        Self::with_timeout(
            endpoint,
            model,
            None,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Creates a new client with explicit key and timeout
    pub fn with_timeout(
        endpoint: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            api_key,
            http_client,
            timeout,
        }
    }

    /// Creates a client from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self::with_timeout(
            config.ai_endpoint.clone(),
            config.ai_model.clone(),
            config.ai_api_key.clone(),
            Duration::from_secs(config.ai_timeout_secs),
        )
    }

    /// Checks if the inference service is available and healthy
    ///
    /// Makes a lightweight request to the `/v1/models` endpoint to verify
    /// that the service is running and accessible.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the server is healthy, `Ok(false)` if unreachable,
    /// or `Err` if there's a connection error.
    pub async fn health_check(&self) -> Result<bool, BackendError> {
        let url = format!("{}/v1/models", self.endpoint);

        debug!("Checking service health at {}", url);

        match self.http_client.get(&url).send().await {
            Ok(response) => {
                let is_healthy = response.status().is_success();
                if is_healthy {
                    info!("Service health check successful");
                } else {
                    warn!(
                        "Service health check failed with status: {}",
                        response.status()
                    );
                }
                Ok(is_healthy)
            }
            Err(e) => {
                if e.is_timeout() {
                    warn!("Service health check timed out");
                    Ok(false)
                } else if e.is_connect() {
                    warn!("Cannot connect to service at {}", self.endpoint);
                    Ok(false)
                } else {
                    error!("Service health check error: {}", e);
                    Err(BackendError::NetworkError {
                        message: format!("Health check failed: {}", e),
                    })
                }
            }
        }
    }

    /// Internal method to call the chat-completions API
    async fn generate(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);

        let body = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                WireMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: Some(request.temperature),
            stream: Some(false),
        };

        debug!(
            "Sending request to service: prompt_length={}",
            request.user.len()
        );

        let start = Instant::now();

        let mut builder = self.http_client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                error!("Service request timed out after {:?}", self.timeout);
                BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                }
            } else if e.is_connect() {
                error!("Cannot connect to service at {}", self.endpoint);
                BackendError::NetworkError {
                    message: format!("Connection failed: {}", e),
                }
            } else {
                error!("Service request error: {}", e);
                BackendError::NetworkError {
                    message: format!("Request failed: {}", e),
                }
            }
        })?;

        let elapsed = start.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();

            error!("Service API returned error status {}: {}", status, text);

            return Err(match status.as_u16() {
                401 | 403 => BackendError::AuthenticationError {
                    message: format!("HTTP {}: {}", status, text),
                },
                429 => BackendError::RateLimitError { retry_after },
                code => BackendError::ApiError {
                    message: format!("AI analysis failed: {}", status),
                    status_code: Some(code),
                },
            });
        }

        let api_response: CompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse service response: {}", e);
            BackendError::InvalidResponse {
                message: format!("JSON parse error: {}", e),
                raw_response: None,
            }
        })?;

        info!(
            "Service generation completed in {:.2}s",
            elapsed.as_secs_f64()
        );

        debug!(
            "Service stats: prompt_tokens={}, completion_tokens={}",
            api_response
                .usage
                .as_ref()
                .map(|u| u.prompt_tokens)
                .unwrap_or(0),
            api_response
                .usage
                .as_ref()
                .map(|u| u.completion_tokens)
                .unwrap_or(0),
        );

        let content = api_response
            .choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .map(|message| message.content.clone())
            .ok_or_else(|| BackendError::InvalidResponse {
                message: "No content in service response".to_string(),
                raw_response: None,
            })?;

        Ok(content)
    }
}

#[async_trait]
impl CompletionBackend for GatewayClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, BackendError> {
        let reply = self.generate(&request).await?;
        debug!("Received response with {} characters", reply.len());
        Ok(reply)
    }

    fn name(&self) -> &str {
        "gateway"
    }

    fn model_info(&self) -> Option<String> {
        Some(format!("{} @ {}", self.model, self.endpoint))
    }
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Message structure for the chat-completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    /// Role: "system", "user", or "assistant"
    role: String,
    /// Message content
    content: String,
}

/// Request structure for the chat-completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompletionRequest {
    /// Model identifier
    model: String,
    /// Array of messages in conversation
    messages: Vec<WireMessage>,
    /// Sampling temperature (0.0-2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Response structure from the chat-completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompletionResponse {
    /// Response ID
    id: Option<String>,
    /// Model used
    model: Option<String>,
    /// Array of completion choices
    choices: Vec<CompletionChoice>,
    /// Token usage statistics
    usage: Option<TokenUsage>,
}

/// Completion choice from API response
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompletionChoice {
    /// Choice index
    index: Option<u32>,
    /// Stop reason
    finish_reason: Option<String>,
    /// Message content
    message: Option<WireMessage>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenUsage {
    /// Number of prompt tokens
    prompt_tokens: u32,
    /// Number of completion tokens
    completion_tokens: u32,
    /// Total tokens
    total_tokens: u32,
}
