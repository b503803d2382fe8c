//! SurrealDB-backed store
//!
//! Persists analyses, shares, and rate counters through the `Any` engine,
//! so one code path covers `mem://` (ephemeral), `surrealkv://` (local
//! file) and `ws://` (remote) endpoints. Row structs live here and are
//! converted to the `store` domain types at the boundary.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::types::AnalysisDocument;
use crate::store::{
    generate_share_token, AnalysisStore, CacheKey, CachedAnalysis, SharedResult, StoreError,
    StoreResult, MAX_TOKEN_ATTEMPTS,
};

/// SurrealDB-backed implementation of [`AnalysisStore`]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Connects to the given endpoint and prepares the schema.
    ///
    /// For `surrealkv://` endpoints the backing directory is created
    /// first so a fresh machine works without manual setup.
    pub async fn connect(endpoint: &str) -> StoreResult<Self> {
        if let Some(path) = endpoint.strip_prefix("surrealkv://") {
            std::fs::create_dir_all(path).map_err(|e| {
                StoreError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path, e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(endpoint)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to {}: {}", endpoint, e)))?;

        db.use_ns("pindrift")
            .use_db("main")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        init_schema(&db).await?;

        info!("SurrealStore connected ({})", endpoint);
        Ok(Self { db })
    }

    /// Creates an in-memory instance, mostly for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("mem://").await
    }
}

/// Initializes all tables and indexes.
///
/// Safe to call multiple times (idempotent).
async fn init_schema(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing pindrift schema");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS analysis_cache SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_cache_key ON TABLE analysis_cache COLUMNS cache_key UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_cache_expires_at ON TABLE analysis_cache COLUMNS expires_at;

        DEFINE TABLE IF NOT EXISTS shared_results SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_share_token ON TABLE shared_results COLUMNS share_token UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_share_created_at ON TABLE shared_results COLUMNS created_at;

        DEFINE TABLE IF NOT EXISTS rate_limits SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_rate_key ON TABLE rate_limits COLUMNS rate_key UNIQUE;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StoreError::Connection(format!("Schema initialization failed: {}", e)))?;

    debug!("Schema initialization complete");
    Ok(())
}

/// Stable record id derived from a logical key, so upserts address the
/// same row no matter which instance writes it.
fn record_id(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn backend_err(e: surrealdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// DB row for `shared_results`.
///
/// Kept separate from [`SharedResult`] because a field literally named
/// `id` would collide with SurrealDB's record id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShareRow {
    share_id: String,
    share_token: String,
    repository_url: String,
    analysis: Value,
    created_at: DateTime<Utc>,
    view_count: i64,
}

impl ShareRow {
    fn into_shared(self) -> SharedResult {
        SharedResult {
            id: self.share_id,
            share_token: self.share_token,
            repository_url: self.repository_url,
            analysis: self.analysis,
            created_at: self.created_at,
            view_count: self.view_count,
        }
    }
}

/// DB row for `rate_limits`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateRow {
    rate_key: String,
    count: u32,
    resets_at: DateTime<Utc>,
}

#[async_trait]
impl AnalysisStore for SurrealStore {
    async fn cache_get(&self, key: &CacheKey) -> StoreResult<Option<CachedAnalysis>> {
        let mut res = self
            .db
            .query("SELECT * FROM analysis_cache WHERE cache_key = $key AND expires_at > $now")
            .bind(("key", key.render()))
            .bind(("now", Utc::now()))
            .await
            .map_err(backend_err)?;

        let rows: Vec<CachedAnalysis> = res.take(0).map_err(backend_err)?;
        Ok(rows.into_iter().next())
    }

    async fn cache_put(
        &self,
        key: &CacheKey,
        repository_url: &str,
        document: &AnalysisDocument,
        ttl_hours: i64,
    ) -> StoreResult<()> {
        let now = Utc::now();
        let row = CachedAnalysis {
            cache_key: key.render(),
            repository_url: repository_url.to_string(),
            document: document.clone(),
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours),
        };

        debug!(cache_key = %row.cache_key, "caching analysis");

        let _upserted: Option<CachedAnalysis> = self
            .db
            .upsert(("analysis_cache", record_id(&row.cache_key)))
            .content(row)
            .await
            .map_err(backend_err)?;

        Ok(())
    }

    async fn share_create(
        &self,
        repository_url: &str,
        analysis: &Value,
    ) -> StoreResult<SharedResult> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_share_token();

            let mut res = self
                .db
                .query("SELECT * FROM shared_results WHERE share_token = $token")
                .bind(("token", token.clone()))
                .await
                .map_err(backend_err)?;
            let existing: Vec<ShareRow> = res.take(0).map_err(backend_err)?;
            if !existing.is_empty() {
                continue;
            }

            let row = ShareRow {
                share_id: Uuid::new_v4().to_string(),
                share_token: token,
                repository_url: repository_url.to_string(),
                analysis: analysis.clone(),
                created_at: Utc::now(),
                view_count: 0,
            };

            let _created: Option<ShareRow> = self
                .db
                .create("shared_results")
                .content(row.clone())
                .await
                .map_err(backend_err)?;

            return Ok(row.into_shared());
        }

        Err(StoreError::TokenExhausted)
    }

    async fn share_get(&self, token: &str) -> StoreResult<Option<SharedResult>> {
        let mut res = self
            .db
            .query("UPDATE shared_results SET view_count += 1 WHERE share_token = $token RETURN AFTER")
            .bind(("token", token.to_string()))
            .await
            .map_err(backend_err)?;

        let rows: Vec<ShareRow> = res.take(0).map_err(backend_err)?;
        Ok(rows.into_iter().next().map(ShareRow::into_shared))
    }

    async fn rate_check(&self, key: &str, limit: u32, window_secs: i64) -> StoreResult<bool> {
        let mut res = self
            .db
            .query("SELECT * FROM rate_limits WHERE rate_key = $key")
            .bind(("key", key.to_string()))
            .await
            .map_err(backend_err)?;
        let rows: Vec<RateRow> = res.take(0).map_err(backend_err)?;

        let now = Utc::now();
        let row = match rows.into_iter().next() {
            Some(row) if now <= row.resets_at => {
                if row.count >= limit {
                    return Ok(false);
                }
                RateRow {
                    rate_key: row.rate_key,
                    count: row.count + 1,
                    resets_at: row.resets_at,
                }
            }
            _ => RateRow {
                rate_key: key.to_string(),
                count: 1,
                resets_at: now + Duration::seconds(window_secs),
            },
        };

        let _upserted: Option<RateRow> = self
            .db
            .upsert(("rate_limits", record_id(key)))
            .content(row)
            .await
            .map_err(backend_err)?;

        Ok(true)
    }
}
