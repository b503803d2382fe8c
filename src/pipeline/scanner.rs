//! Scan orchestration
//!
//! [`Scanner`] drives one analysis end to end: repository resolution,
//! cache probe, manifest discovery, version sniffing, AI analysis,
//! interpretation, scoring, vulnerability lookup, and the best-effort
//! cache write-back. Local scans reuse the same tail of the pipeline
//! without touching GitHub or the cache.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ai::backend::{BackendError, ChatRequest, CompletionBackend};
use crate::analysis::prompt::{build_analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
use crate::analysis::response::{interpret_reply, InterpretError};
use crate::analysis::score::reproducibility_score;
use crate::analysis::types::{AnalysisData, AnalysisDocument};
use crate::github::{GithubClient, RepoRef, RepoRefError};
use crate::manifest::locator::{Discovery, LocateError, ManifestLocator};
use crate::manifest::version::VersionSniffer;
use crate::manifest::{DetectedVersion, ManifestFile};
use crate::osv::{pinned_packages, OsvClient, PackageQuery};
use crate::store::{AnalysisStore, CacheKey};

/// Everything that can end a scan early
#[derive(Debug, Error)]
pub enum ScanError {
    /// The target is not a recognizable GitHub URL
    #[error(transparent)]
    InvalidUrl(#[from] RepoRefError),

    /// The repository has no Python dependency files
    #[error(transparent)]
    NoManifests(#[from] LocateError),

    /// The AI gateway failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The AI reply could not be turned into an analysis
    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

impl ScanError {
    /// Whether the failure is the caller's input rather than a system fault
    pub fn is_user_error(&self) -> bool {
        matches!(self, ScanError::InvalidUrl(_) | ScanError::NoManifests(_))
    }
}

/// One configured scan pipeline
pub struct Scanner {
    github: GithubClient,
    backend: Arc<dyn CompletionBackend>,
    store: Option<Arc<dyn AnalysisStore>>,
    osv: Option<OsvClient>,
    cache_ttl_hours: i64,
}

impl Scanner {
    /// Creates a scanner with no cache and no vulnerability lookup
    pub fn new(github: GithubClient, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            github,
            backend,
            store: None,
            osv: None,
            cache_ttl_hours: 24,
        }
    }

    /// Enables the analysis cache with the given TTL
    pub fn with_store(mut self, store: Arc<dyn AnalysisStore>, ttl_hours: i64) -> Self {
        self.store = Some(store);
        self.cache_ttl_hours = ttl_hours;
        self
    }

    /// Enables OSV vulnerability lookup
    pub fn with_osv(mut self, osv: OsvClient) -> Self {
        self.osv = Some(osv);
        self
    }

    /// Analyzes a GitHub repository by URL.
    ///
    /// A fresh cached analysis for the same repository and commit is
    /// returned verbatim without touching the AI gateway. A cache write
    /// failure after a successful analysis is logged and swallowed.
    pub async fn scan_repo(&self, repo_url: &str) -> Result<AnalysisDocument, ScanError> {
        let repo = RepoRef::parse(repo_url)?;
        info!("Scanning repository {}", repo);

        let cache_key = match &self.store {
            Some(store) => {
                let short_sha = self.github.latest_short_sha(&repo).await;
                let key = CacheKey::for_repo(repo_url, short_sha);
                debug!(cache_key = %key, pinned = key.is_commit_pinned(), "cache probe");

                match store.cache_get(&key).await {
                    Ok(Some(hit)) => {
                        info!("Returning cached analysis for {}", key);
                        return Ok(hit.document);
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Cache lookup failed, running full scan: {}", e),
                }
                Some(key)
            }
            None => None,
        };

        let discovery = ManifestLocator::new(&self.github).locate(&repo).await?;
        let version = VersionSniffer::new(&self.github)
            .sniff(&repo, &discovery.branch, &discovery.files)
            .await;

        let document = self.analyze(discovery, version).await?;

        if let (Some(store), Some(key)) = (&self.store, &cache_key) {
            if let Err(e) = store
                .cache_put(key, repo_url, &document, self.cache_ttl_hours)
                .await
            {
                warn!("Failed to cache analysis for {}: {}", key, e);
            }
        }

        Ok(document)
    }

    /// Analyzes manifest files supplied by the caller.
    ///
    /// Used for local scans: there is no repository identity, so the cache
    /// and GitHub are never consulted, and the caller provides whatever
    /// Python version it sniffed from its own filesystem.
    pub async fn scan_local(
        &self,
        files: Vec<ManifestFile>,
        version: DetectedVersion,
    ) -> Result<AnalysisDocument, ScanError> {
        if files.is_empty() {
            return Err(LocateError::NoManifestsFound.into());
        }

        let discovery = Discovery {
            branch: "local".to_string(),
            files,
        };
        self.analyze(discovery, version).await
    }

    /// The provider-facing tail shared by remote and local scans
    async fn analyze(
        &self,
        discovery: Discovery,
        version: DetectedVersion,
    ) -> Result<AnalysisDocument, ScanError> {
        let prompt = build_analysis_prompt(&discovery.files, &version);
        debug!("Built analysis prompt with {} characters", prompt.len());

        let reply = self
            .backend
            .complete(ChatRequest::new(ANALYSIS_SYSTEM_PROMPT, prompt))
            .await?;

        let parsed = interpret_reply(&reply)?;
        let score = reproducibility_score(&parsed.issues, &parsed.dependency_diff);

        let vulnerabilities = match &self.osv {
            Some(osv) => {
                let mut queries: Vec<PackageQuery> = discovery
                    .files
                    .iter()
                    .flat_map(|f| pinned_packages(&f.content))
                    .collect();
                queries.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
                queries.dedup();
                osv.scan(&queries).await
            }
            None => Vec::new(),
        };

        info!(
            score,
            issues = parsed.issues.len(),
            vulnerabilities = vulnerabilities.len(),
            "analysis complete"
        );

        let data = AnalysisData {
            issues: parsed.issues,
            suggestions: parsed.suggestions,
            dependency_diff: parsed.dependency_diff,
            vulnerabilities,
            reproducibility_score: score,
        };

        Ok(AnalysisDocument::assemble(&discovery, &version, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockBackend;
    use crate::manifest::ManifestKind;

    fn scanner_with(backend: Arc<MockBackend>) -> Scanner {
        let github = GithubClient::new("http://localhost:1", "http://localhost:1");
        Scanner::new(github, backend)
    }

    fn pip_file(content: &str) -> ManifestFile {
        ManifestFile::new(ManifestKind::Pip, content)
    }

    #[tokio::test]
    async fn test_scan_local_rejects_empty_file_set() {
        let scanner = scanner_with(Arc::new(MockBackend::new()));

        let result = scanner
            .scan_local(Vec::new(), DetectedVersion::not_detected())
            .await;

        assert!(matches!(result, Err(ScanError::NoManifests(_))));
    }

    #[tokio::test]
    async fn test_scan_local_builds_document() {
        let backend = Arc::new(MockBackend::new());
        backend.push_reply(
            r#"{"issues":[{"title":"Missing version pin","package":"numpy","severity":"high","category":"missing_pin","description":"numpy has no version specified"}],"suggestions":["Pin numpy"],"dependencyDiff":[{"package":"numpy","before":"unversioned","after":"1.26.2"},{"package":"pandas","before":"1.3.0","after":"1.3.0"}]}"#,
        );
        let scanner = scanner_with(backend.clone());

        let document = scanner
            .scan_local(
                vec![pip_file("numpy\npandas==1.3.0\n")],
                DetectedVersion::not_detected(),
            )
            .await
            .unwrap();

        assert_eq!(backend.call_count(), 1);
        assert_eq!(document.data.issues.len(), 1);
        assert_eq!(document.data.reproducibility_score, 95);
        assert_eq!(document.detected_formats, vec!["Requirements.txt"]);
        assert_eq!(document.python_version, "unknown");
        assert!(document.data.vulnerabilities.is_empty());
    }

    #[tokio::test]
    async fn test_scan_local_propagates_backend_errors() {
        let backend = Arc::new(MockBackend::new());
        backend.push_error(BackendError::RateLimitError { retry_after: None });
        let scanner = scanner_with(backend);

        let result = scanner
            .scan_local(vec![pip_file("numpy\n")], DetectedVersion::not_detected())
            .await;

        assert!(matches!(result, Err(ScanError::Backend(_))));
    }

    #[tokio::test]
    async fn test_scan_local_propagates_interpret_errors() {
        let backend = Arc::new(MockBackend::new());
        backend.push_reply("this is not json");
        let scanner = scanner_with(backend);

        let result = scanner
            .scan_local(vec![pip_file("numpy\n")], DetectedVersion::not_detected())
            .await;

        assert!(matches!(result, Err(ScanError::Interpret(_))));
    }

    #[tokio::test]
    async fn test_scan_repo_rejects_bad_url() {
        let scanner = scanner_with(Arc::new(MockBackend::new()));

        let result = scanner.scan_repo("https://example.com/not-github").await;

        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
        assert!(result.unwrap_err().is_user_error());
    }
}
