//! OSV.dev vulnerability lookup
//!
//! Queries the OSV batch API for known advisories against exact-pinned
//! packages, then pulls details for a bounded number of hits. Lookup is
//! best-effort: any failure degrades to an empty result so a scan never
//! fails because OSV is unreachable.

use crate::analysis::types::Vulnerability;
use futures_util::future::join_all;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Request timeout for OSV calls
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on packages sent in one batch query
const MAX_QUERIES: usize = 40;

/// Upper bound on per-advisory detail lookups
const MAX_DETAILS: usize = 10;

/// Errors from the OSV API
#[derive(Debug, Error)]
pub enum OsvError {
    /// Transport-level failure
    #[error("OSV request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("OSV returned status {0}")]
    Status(u16),
}

/// One package/version pair to check against OSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageQuery {
    pub name: String,
    pub version: String,
}

/// Extracts exact-pinned packages from requirements-style content.
///
/// Only `name==version` pins are returned: OSV needs a concrete version
/// to match advisories, so unpinned and range-constrained entries are
/// skipped. Extras markers (`requests[security]`) are dropped from the
/// name.
pub fn pinned_packages(content: &str) -> Vec<PackageQuery> {
    let pin = Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*==\s*([A-Za-z0-9.+!_-]+)")
        .expect("valid pin regex");

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            pin.captures(line).map(|caps| PackageQuery {
                name: caps[1].to_string(),
                version: caps[2].to_string(),
            })
        })
        .collect()
}

/// Client for the OSV.dev REST API
#[derive(Debug, Clone)]
pub struct OsvClient {
    base_url: String,
    http: Client,
}

impl OsvClient {
    /// Creates a client against the given OSV base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("pindrift/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Looks up advisories for the given pinned packages.
    ///
    /// Never fails: errors are logged and an empty list is returned so the
    /// surrounding scan carries on without vulnerability data.
    pub async fn scan(&self, queries: &[PackageQuery]) -> Vec<Vulnerability> {
        if queries.is_empty() {
            return Vec::new();
        }

        let bounded = &queries[..queries.len().min(MAX_QUERIES)];

        let batch = match self.query_batch(bounded).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("OSV batch query failed, skipping vulnerability scan: {}", e);
                return Vec::new();
            }
        };

        // Pair each advisory id with the package that triggered it, then
        // cap the detail fanout.
        let mut hits: Vec<(PackageQuery, String)> = Vec::new();
        for (query, refs) in bounded.iter().zip(batch) {
            for vuln_ref in refs {
                hits.push((query.clone(), vuln_ref.id));
            }
        }
        hits.truncate(MAX_DETAILS);

        if hits.is_empty() {
            debug!("OSV reported no advisories for {} packages", bounded.len());
            return Vec::new();
        }

        let lookups = hits.iter().map(|(query, id)| async move {
            match self.fetch_details(id).await {
                Ok(record) => Some(record.into_vulnerability(&query.name, &query.version)),
                Err(e) => {
                    warn!("OSV detail lookup for {} failed: {}", id, e);
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }

    async fn query_batch(&self, queries: &[PackageQuery]) -> Result<Vec<Vec<VulnRef>>, OsvError> {
        let url = format!("{}/v1/querybatch", self.base_url);

        let body = BatchRequest {
            queries: queries
                .iter()
                .map(|q| BatchQuery {
                    package: OsvPackage {
                        name: q.name.clone(),
                        ecosystem: "PyPI".to_string(),
                    },
                    version: q.version.clone(),
                })
                .collect(),
        };

        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(OsvError::Status(response.status().as_u16()));
        }

        let batch: BatchResponse = response.json().await?;
        Ok(batch
            .results
            .into_iter()
            .map(|r| r.vulns.unwrap_or_default())
            .collect())
    }

    async fn fetch_details(&self, id: &str) -> Result<VulnRecord, OsvError> {
        let url = format!("{}/v1/vulns/{}", self.base_url, id);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(OsvError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    queries: Vec<BatchQuery>,
}

#[derive(Debug, Serialize)]
struct BatchQuery {
    package: OsvPackage,
    version: String,
}

#[derive(Debug, Serialize)]
struct OsvPackage {
    name: String,
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<BatchResult>,
}

#[derive(Debug, Deserialize)]
struct BatchResult {
    vulns: Option<Vec<VulnRef>>,
}

#[derive(Debug, Deserialize)]
struct VulnRef {
    id: String,
}

/// Advisory record from `/v1/vulns/{id}`, reduced to the fields we render
#[derive(Debug, Deserialize)]
struct VulnRecord {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    database_specific: Option<DatabaseSpecific>,
    #[serde(default)]
    affected: Vec<Affected>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSpecific {
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Affected {
    #[serde(default)]
    ranges: Vec<AffectedRange>,
}

#[derive(Debug, Deserialize)]
struct AffectedRange {
    #[serde(default)]
    events: Vec<RangeEvent>,
}

#[derive(Debug, Deserialize)]
struct RangeEvent {
    #[serde(default)]
    fixed: Option<String>,
}

impl VulnRecord {
    fn into_vulnerability(self, package: &str, version: &str) -> Vulnerability {
        let severity = self
            .database_specific
            .and_then(|d| d.severity)
            .unwrap_or_else(|| "UNKNOWN".to_string());

        let mut fixed_versions: Vec<String> = self
            .affected
            .into_iter()
            .flat_map(|a| a.ranges)
            .flat_map(|r| r.events)
            .filter_map(|e| e.fixed)
            .collect();
        fixed_versions.dedup();

        Vulnerability {
            link: format!("https://osv.dev/vulnerability/{}", self.id),
            id: self.id,
            package: package.to_string(),
            version: version.to_string(),
            severity,
            summary: self.summary.unwrap_or_default(),
            fixed_versions,
        }
    }
}
