//! Persistence seam for analysis caching, sharing, and rate limiting
//!
//! Everything that outlives a single request goes through the
//! [`AnalysisStore`] trait: cached analyses, shared results, and
//! fixed-window rate counters. Two implementations exist:
//! [`MemoryStore`] for tests and single-process deployments, and
//! [`SurrealStore`] for durable or shared storage.

pub mod memory;
pub mod surreal;

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

use crate::analysis::types::AnalysisDocument;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Share tokens are 12 characters from `[A-Za-z0-9]`
pub const SHARE_TOKEN_LEN: usize = 12;

/// Total token generation attempts before giving up on a collision streak
pub const MAX_TOKEN_ATTEMPTS: usize = 5;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach or initialize the backing store
    #[error("Storage connection error: {0}")]
    Connection(String),

    /// The backing store rejected an operation
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Token generation kept colliding with existing shares
    #[error("Failed to generate unique share token")]
    TokenExhausted,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Identity of a cached analysis.
///
/// A key pinned to a commit invalidates itself whenever the repository
/// moves; a URL-only key is the degraded fallback when the commit lookup
/// failed, where staleness is bounded only by the TTL. Keeping the two
/// cases distinct lets callers see which guarantee they got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    /// Key bound to the repository head at scan time
    CommitPinned { repo_url: String, short_sha: String },

    /// Fallback key when no commit identity was available
    UrlOnly { repo_url: String },
}

impl CacheKey {
    /// Builds the appropriate variant for an optional commit lookup result
    pub fn for_repo(repo_url: impl Into<String>, short_sha: Option<String>) -> Self {
        let repo_url = repo_url.into();
        match short_sha {
            Some(short_sha) => CacheKey::CommitPinned {
                repo_url,
                short_sha,
            },
            None => CacheKey::UrlOnly { repo_url },
        }
    }

    /// The repository URL this key belongs to
    pub fn repo_url(&self) -> &str {
        match self {
            CacheKey::CommitPinned { repo_url, .. } => repo_url,
            CacheKey::UrlOnly { repo_url } => repo_url,
        }
    }

    /// Whether this key carries commit identity
    pub fn is_commit_pinned(&self) -> bool {
        matches!(self, CacheKey::CommitPinned { .. })
    }

    /// The stored string form: `"{url}-{sha}"` or `"{url}"`
    pub fn render(&self) -> String {
        match self {
            CacheKey::CommitPinned {
                repo_url,
                short_sha,
            } => format!("{}-{}", repo_url, short_sha),
            CacheKey::UrlOnly { repo_url } => repo_url.clone(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// One cached analysis row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAnalysis {
    pub cache_key: String,
    pub repository_url: String,
    pub document: AnalysisDocument,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One shared result row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedResult {
    pub id: String,
    pub share_token: String,
    pub repository_url: String,
    pub analysis: Value,
    pub created_at: DateTime<Utc>,
    pub view_count: i64,
}

/// Generates one candidate share token
pub fn generate_share_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Persistence operations behind every endpoint that keeps state
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Returns the cached analysis for `key` if a non-expired row exists.
    async fn cache_get(&self, key: &CacheKey) -> StoreResult<Option<CachedAnalysis>>;

    /// Upserts an analysis under `key` with a TTL in hours.
    async fn cache_put(
        &self,
        key: &CacheKey,
        repository_url: &str,
        document: &AnalysisDocument,
        ttl_hours: i64,
    ) -> StoreResult<()>;

    /// Stores a shared result under a fresh unique token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TokenExhausted`] if `MAX_TOKEN_ATTEMPTS`
    /// generated tokens all collided.
    async fn share_create(&self, repository_url: &str, analysis: &Value)
        -> StoreResult<SharedResult>;

    /// Fetches a shared result by token, incrementing its view counter.
    ///
    /// The returned row carries the incremented count. The
    /// read-then-update is not transactional; concurrent reads can
    /// under-count (accepted imprecision).
    async fn share_get(&self, token: &str) -> StoreResult<Option<SharedResult>>;

    /// Fixed-window counter check for `key`.
    ///
    /// The first request in a window sets count 1 and the reset time
    /// `window_secs` ahead; later requests increment until `limit` and
    /// are denied beyond it. Returns whether the request is allowed.
    async fn rate_check(&self, key: &str, limit: u32, window_secs: i64) -> StoreResult<bool>;
}
