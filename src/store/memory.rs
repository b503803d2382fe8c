//! In-memory store
//!
//! `Mutex<HashMap>` tables satisfying the [`AnalysisStore`] contract
//! without external dependencies. Used by the test suite and by
//! `serve --memory`, where losing state on restart is acceptable.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::analysis::types::AnalysisDocument;
use crate::store::{
    generate_share_token, AnalysisStore, CacheKey, CachedAnalysis, SharedResult, StoreError,
    StoreResult, MAX_TOKEN_ATTEMPTS,
};

#[derive(Debug, Clone)]
struct RateWindow {
    count: u32,
    resets_at: DateTime<Utc>,
}

/// In-memory implementation of [`AnalysisStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    cache: Mutex<HashMap<String, CachedAnalysis>>,
    shares: Mutex<HashMap<String, SharedResult>>,
    rates: Mutex<HashMap<String, RateWindow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn cache_get(&self, key: &CacheKey) -> StoreResult<Option<CachedAnalysis>> {
        let cache = self.cache.lock().unwrap();
        Ok(cache
            .get(&key.render())
            .filter(|row| row.expires_at > Utc::now())
            .cloned())
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

        let mut cache = self.cache.lock().unwrap();
        cache.insert(key.render(), row);
        Ok(())
    }

    async fn share_create(
        &self,
        repository_url: &str,
        analysis: &Value,
    ) -> StoreResult<SharedResult> {
        let mut shares = self.shares.lock().unwrap();

        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_share_token();
            if shares.contains_key(&token) {
                continue;
            }

            let row = SharedResult {
                id: Uuid::new_v4().to_string(),
                share_token: token.clone(),
                repository_url: repository_url.to_string(),
                analysis: analysis.clone(),
                created_at: Utc::now(),
                view_count: 0,
            };
            shares.insert(token, row.clone());
            return Ok(row);
        }

        Err(StoreError::TokenExhausted)
    }

    async fn share_get(&self, token: &str) -> StoreResult<Option<SharedResult>> {
        let mut shares = self.shares.lock().unwrap();
        Ok(shares.get_mut(token).map(|row| {
            row.view_count += 1;
            row.clone()
        }))
    }

    async fn rate_check(&self, key: &str, limit: u32, window_secs: i64) -> StoreResult<bool> {
        let now = Utc::now();
        let mut rates = self.rates.lock().unwrap();

        match rates.get_mut(key) {
            Some(window) if now <= window.resets_at => {
                if window.count >= limit {
                    return Ok(false);
                }
                window.count += 1;
                Ok(true)
            }
            _ => {
                rates.insert(
                    key.to_string(),
                    RateWindow {
                        count: 1,
                        resets_at: now + Duration::seconds(window_secs),
                    },
                );
                Ok(true)
            }
        }
    }
}
