//! HTTP client for the GitHub API and raw content host
//!
//! Three calls, all unauthenticated: a branch-existence probe, raw file
//! fetches, and a latest-commit lookup for cache keying. Every method is
//! infallible by design — probe targets that fail to fetch are reported as
//! absent, and the commit lookup degrades to `None` — because a transient
//! network failure is indistinguishable from "file not there" at this layer
//! and the pipeline treats both the same way.

use crate::github::repo::RepoRef;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for individual GitHub requests
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Length of the short commit SHA used in cache keys
const SHORT_SHA_LEN: usize = 7;

/// Client for branch probes, raw file fetches, and commit lookups
///
/// Base URLs are injected so tests can point the client at a local mock
/// server; production uses `https://api.github.com` and
/// `https://raw.githubusercontent.com`.
#[derive(Debug, Clone)]
pub struct GithubClient {
    /// REST API base (branch metadata, commits)
    api_base: String,

    /// Raw content base (manifest file bodies)
    raw_base: String,

    /// Shared HTTP client with connection pooling
    http: Client,
}

/// Minimal commit shape from `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Deserialize)]
struct CommitEntry {
    sha: String,
}

impl GithubClient {
    /// Creates a client against the given API and raw-content base URLs
    pub fn new(api_base: impl Into<String>, raw_base: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("pindrift/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            raw_base: raw_base.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Resolves the branch to probe: `main` if the branch-metadata endpoint
    /// confirms it, otherwise `master`. No further fallback — a repository
    /// using any other default branch will simply yield no files downstream.
    pub async fn default_branch(&self, repo: &RepoRef) -> String {
        let url = format!("{}/repos/{}/{}/branches/main", self.api_base, repo.owner, repo.repo);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(repo = %repo, "branch probe: main exists");
                "main".to_string()
            }
            Ok(response) => {
                debug!(repo = %repo, status = %response.status(), "branch probe: falling back to master");
                "master".to_string()
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "branch probe failed, falling back to master");
                "master".to_string()
            }
        }
    }

    /// Fetches one file from the raw content host
    ///
    /// Returns `None` for 404s and for any transport failure; both mean
    /// "absent" to the caller. No retries.
    pub async fn fetch_raw(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<String> {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.raw_base, repo.owner, repo.repo, branch, path
        );

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => {
                    debug!(path, bytes = body.len(), "fetched manifest candidate");
                    Some(body)
                }
                Err(e) => {
                    warn!(path, error = %e, "failed to read raw response body");
                    None
                }
            },
            Ok(response) => {
                debug!(path, status = %response.status(), "candidate absent");
                None
            }
            Err(e) => {
                debug!(path, error = %e, "candidate fetch failed, treating as absent");
                None
            }
        }
    }

    /// Best-effort lookup of the most recent commit's short SHA on the
    /// default branch. Any failure yields `None`, which callers treat as
    /// "key the cache by URL only".
    pub async fn latest_short_sha(&self, repo: &RepoRef) -> Option<String> {
        let url = format!(
            "{}/repos/{}/{}/commits?per_page=1",
            self.api_base, repo.owner, repo.repo
        );

        let response = match self.http.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(repo = %repo, status = %r.status(), "commit lookup failed");
                return None;
            }
            Err(e) => {
                debug!(repo = %repo, error = %e, "commit lookup failed");
                return None;
            }
        };

        let commits: Vec<CommitEntry> = match response.json().await {
            Ok(c) => c,
            Err(e) => {
                debug!(repo = %repo, error = %e, "commit lookup returned unexpected body");
                return None;
            }
        };

        let sha = commits.first()?.sha.trim().to_string();
        if sha.len() < SHORT_SHA_LEN || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            debug!(repo = %repo, sha, "commit lookup returned a non-SHA value");
            return None;
        }

        Some(sha[..SHORT_SHA_LEN].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_urls_are_normalized() {
        let client = GithubClient::new("https://api.github.com/", "https://raw.githubusercontent.com/");
        assert_eq!(client.api_base, "https://api.github.com");
        assert_eq!(client.raw_base, "https://raw.githubusercontent.com");
    }

    #[test]
    fn test_commit_entry_parses() {
        let entries: Vec<CommitEntry> =
            serde_json::from_str(r#"[{"sha": "0123456789abcdef", "commit": {}}]"#).unwrap();
        assert_eq!(entries[0].sha, "0123456789abcdef");
    }
}
