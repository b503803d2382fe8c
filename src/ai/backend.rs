//! Completion backend abstraction
//!
//! This module provides the core trait and types for talking to an AI
//! model. All backends implement the `CompletionBackend` trait so the
//! scan pipeline and the snapshot generator stay provider-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default sampling temperature for analysis requests
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Errors that can occur during backend operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or credentials are invalid
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded, retry after the specified duration (in seconds)
    RateLimitError { retry_after: Option<u64> },

    /// Invalid or malformed response from the model
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Configuration error (missing API keys, invalid settings, etc.)
    ConfigurationError { message: String },

    /// Network-related error
    NetworkError { message: String },
}

impl BackendError {
    /// HTTP status associated with this error, when one exists.
    ///
    /// Rate-limit and payment errors from upstream providers surface here
    /// so callers can map them to tailored user-facing messages.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            BackendError::ApiError { status_code, .. } => *status_code,
            BackendError::AuthenticationError { .. } => Some(401),
            BackendError::RateLimitError { .. } => Some(429),
            _ => None,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::AuthenticationError { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::RateLimitError { retry_after } => {
                if let Some(seconds) = retry_after {
                    write!(f, "Rate limit exceeded, retry after {} seconds", seconds)
                } else {
                    write!(f, "Rate limit exceeded")
                }
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from model: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// One chat-completion request: a system instruction plus a user prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System instruction establishing the model's role
    pub system: String,

    /// User prompt carrying the actual task
    pub user: String,

    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,
}

impl ChatRequest {
    /// Creates a request with the default analysis temperature
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Overrides the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Core trait that all completion backends implement
///
/// # Example
///
/// ```ignore
/// use pindrift::ai::backend::{ChatRequest, CompletionBackend};
///
/// async fn analyze(
///     backend: &dyn CompletionBackend,
/// ) -> Result<(), Box<dyn std::error::Error>> {
///     let reply = backend
///         .complete(ChatRequest::new("You are helpful.", "Say hi"))
///         .await?;
///     println!("{}", reply);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Sends one chat-completion request and returns the assistant text
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the API call fails, times out, or the
    /// response carries no content.
    async fn complete(&self, request: ChatRequest) -> Result<String, BackendError>;

    /// Returns the human-readable name of this backend
    fn name(&self) -> &str;

    /// Returns optional model information for this backend
    fn model_info(&self) -> Option<String> {
        None
    }
}
