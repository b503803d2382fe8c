//! HTTP error envelope
//!
//! Every failed request, whatever its cause, leaves the server as
//! `{"success": false, "error": "..."}` with a 4xx/5xx status. The
//! [`ApiJson`] extractor extends that guarantee to malformed request
//! bodies, which would otherwise get axum's plain-text rejection.

use crate::ai::BackendError;
use crate::config::ConfigError;
use crate::pipeline::ScanError;
use crate::store::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A failed request: status code plus the user-facing message
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// The per-endpoint fixed-window limit was hit
    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again in a minute.",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidUrl(e) => Self::bad_request(e.to_string()),
            ScanError::NoManifests(e) => Self::not_found(e.to_string()),
            ScanError::Backend(e) => Self::from(e),
            ScanError::Interpret(e) => Self::internal(e.to_string()),
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::RateLimitError { .. } => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again in a moment.",
            ),
            BackendError::ApiError {
                status_code: Some(402),
                ..
            } => Self::new(
                StatusCode::PAYMENT_REQUIRED,
                "Payment required. Please add credits to your AI gateway account.",
            ),
            // Keep the gateway's message ("AI analysis failed: {status}")
            // without the Display prefix.
            BackendError::ApiError { message, .. } => Self::internal(message),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::internal(err.to_string())
    }
}

/// `Json` extractor whose rejection is the standard error envelope
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepoRefError;
    use crate::manifest::LocateError;

    #[test]
    fn test_invalid_url_maps_to_400() {
        let err = ApiError::from(ScanError::InvalidUrl(RepoRefError::InvalidUrl));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid GitHub URL format");
    }

    #[test]
    fn test_no_manifests_maps_to_404() {
        let err = ApiError::from(ScanError::NoManifests(LocateError::NoManifestsFound));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.message.contains("No Python dependency files found"));
    }

    #[test]
    fn test_upstream_rate_limit_message() {
        let err = ApiError::from(BackendError::RateLimitError { retry_after: None });
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            err.message,
            "Rate limit exceeded. Please try again in a moment."
        );
    }

    #[test]
    fn test_local_rate_limit_message_differs_from_upstream() {
        let err = ApiError::rate_limited();
        assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            err.message,
            "Rate limit exceeded. Please try again in a minute."
        );
    }

    #[test]
    fn test_payment_required_mapping() {
        let err = ApiError::from(BackendError::ApiError {
            message: "AI generation failed: 402".to_string(),
            status_code: Some(402),
        });
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);
        assert!(err.message.contains("add credits"));
    }

    #[test]
    fn test_generic_api_error_keeps_raw_message() {
        let err = ApiError::from(BackendError::ApiError {
            message: "AI analysis failed: 500".to_string(),
            status_code: Some(500),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "AI analysis failed: 500");
    }

    #[test]
    fn test_token_exhausted_message() {
        let err = ApiError::from(StoreError::TokenExhausted);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to generate unique share token");
    }

    #[test]
    fn test_missing_api_key_maps_to_500() {
        let err = ApiError::from(ConfigError::MissingApiKey);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "PINDRIFT_AI_API_KEY not configured");
    }
}
