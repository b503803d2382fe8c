//! Request handlers for the HTTP API
//!
//! Analysis, sharing, and snapshot generation. The share and snapshot
//! endpoints sit behind per-client fixed-window rate limits backed by the
//! store, so the limits hold across processes. A failed counter read lets
//! the request through.

use crate::manifest::{DetectedVersion, ManifestFile, ManifestKind};
use crate::server::error::{ApiError, ApiJson};
use crate::server::AppState;
use crate::snapshot::{SnapshotRequest, SnapshotResponse};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const SHARE_CREATE_LIMIT: u32 = 20;
const SHARE_GET_LIMIT: u32 = 30;
const SNAPSHOT_LIMIT: u32 = 5;
const RATE_WINDOW_SECS: i64 = 60;

/// Client identity for rate limiting: first `X-Forwarded-For` entry,
/// `"unknown"` when the header is absent.
fn client_id(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce_rate_limit(
    state: &AppState,
    scope: &str,
    headers: &HeaderMap,
    limit: u32,
) -> Result<(), ApiError> {
    let client = client_id(headers);
    let key = format!("{}:{}", scope, client);

    match state.store.rate_check(&key, limit, RATE_WINDOW_SECS).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            warn!(scope, client = %client, "rate limit exceeded");
            Err(ApiError::rate_limited())
        }
        Err(err) => {
            warn!(scope, error = %err, "rate limit check failed, allowing request");
            Ok(())
        }
    }
}

/// Request body for `POST /v1/analyze-repo`: either a GitHub URL or a set
/// of locally read manifest files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub local_files: Option<Vec<LocalFileEntry>>,
    #[serde(default)]
    pub python_version: Option<String>,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub local_path: Option<String>,
}

/// One locally read file posted for analysis
#[derive(Debug, Deserialize)]
pub struct LocalFileEntry {
    pub name: String,
    pub content: String,
}

/// `POST /v1/analyze-repo`
pub async fn analyze_repo(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> Result<Json<Value>, ApiError> {
    if state.config.needs_api_key() {
        state.config.require_api_key()?;
    }

    let document = if request.is_local || request.local_files.is_some() {
        let path = request.local_path.as_deref().unwrap_or(".");
        info!(path, "analyzing local manifest files");

        let files = local_manifest_files(request.local_files.unwrap_or_default());
        let version = match request
            .python_version
            .filter(|v| !v.is_empty() && v != "unknown")
        {
            Some(version) => DetectedVersion::new(version, "local"),
            None => DetectedVersion::not_detected(),
        };
        state.scanner.scan_local(files, version).await?
    } else {
        let repo_url = request
            .repo_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing required field: repoUrl"))?;
        state.scanner.scan_repo(&repo_url).await?
    };

    Ok(Json(json!({ "success": true, "data": document })))
}

/// Classifies posted files against the candidate table, dropping anything
/// that is not a recognized manifest filename.
fn local_manifest_files(entries: Vec<LocalFileEntry>) -> Vec<ManifestFile> {
    entries
        .into_iter()
        .filter_map(|entry| {
            ManifestKind::from_filename(&entry.name)
                .map(|kind| ManifestFile::new(kind, entry.content))
        })
        .collect()
}

/// Request body for `POST /v1/create-share`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    #[serde(default)]
    pub analysis_data: Option<Value>,
    #[serde(default)]
    pub repository_url: Option<String>,
}

/// `POST /v1/create-share`
pub async fn create_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CreateShareRequest>,
) -> Result<Json<Value>, ApiError> {
    enforce_rate_limit(&state, "create-share", &headers, SHARE_CREATE_LIMIT).await?;

    let analysis = request.analysis_data.filter(|value| !value.is_null());
    let repository_url = request.repository_url.filter(|url| !url.is_empty());
    let (analysis, repository_url) = match (analysis, repository_url) {
        (Some(analysis), Some(url)) => (analysis, url),
        _ => {
            return Err(ApiError::bad_request(
                "Missing required fields: analysisData and repositoryUrl",
            ))
        }
    };

    let share = state.store.share_create(&repository_url, &analysis).await?;
    info!(token = %share.share_token, repo = %repository_url, "share created");

    let base = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(|origin| origin.trim_end_matches('/').to_string())
        .unwrap_or_else(|| state.config.share_base());

    Ok(Json(json!({
        "success": true,
        "shareToken": share.share_token,
        "shareUrl": format!("{}/share/{}", base, share.share_token),
    })))
}

/// Query string for `GET /v1/get-share`
#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /v1/get-share?token=...`
pub async fn get_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ShareQuery>,
) -> Result<Json<Value>, ApiError> {
    enforce_rate_limit(&state, "get-share", &headers, SHARE_GET_LIMIT).await?;

    let token = query
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing share token"))?;

    let share = state
        .store
        .share_get(&token)
        .await?
        .ok_or_else(|| ApiError::not_found("Shared result not found"))?;
    debug!(token = %token, views = share.view_count, "share viewed");

    Ok(Json(json!({
        "success": true,
        "data": {
            "analysisData": share.analysis,
            "repositoryUrl": share.repository_url,
            "createdAt": share.created_at,
            "viewCount": share.view_count,
        }
    })))
}

/// `POST /v1/generate-snapshot`
pub async fn generate_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SnapshotRequest>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    enforce_rate_limit(&state, "generate-snapshot", &headers, SNAPSHOT_LIMIT).await?;

    if state.config.needs_api_key() {
        state.config.require_api_key()?;
    }

    let response = state.snapshots.generate(&request).await?;
    Ok(Json(response))
}

/// `GET /healthz`
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}
