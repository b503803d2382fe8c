//! Manifest discovery against the raw content host
//!
//! Resolves the branch to probe (`main` with a `master` fallback), then
//! fetches all six candidate filenames concurrently. Absences are normal;
//! only the zero-hit case is an error, and it carries the user-facing hint
//! message verbatim.

use crate::github::{GithubClient, RepoRef};
use crate::manifest::probe::{self, ProbePolicy};
use crate::manifest::types::{ManifestFile, CANDIDATES};
use futures_util::FutureExt;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from manifest discovery
#[derive(Debug, Error, PartialEq)]
pub enum LocateError {
    /// Every candidate probe came back absent
    #[error("No Python dependency files found (requirements.txt, pyproject.toml, Pipfile, or setup.py)")]
    NoManifestsFound,
}

/// The outcome of a successful discovery: the branch that was probed and
/// every manifest that exists, in candidate order.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub branch: String,
    pub files: Vec<ManifestFile>,
}

impl Discovery {
    /// Format labels of the discovered files, deduplicated, discovery order
    pub fn detected_formats(&self) -> Vec<&'static str> {
        let mut labels: Vec<&'static str> = Vec::new();
        for file in &self.files {
            let label = file.kind.label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }

    /// Format label of the highest-priority discovered file
    pub fn primary_format(&self) -> Option<&'static str> {
        self.files.first().map(|f| f.kind.label())
    }

    /// The highest-priority discovered file
    pub fn primary_file(&self) -> Option<&ManifestFile> {
        self.files.first()
    }
}

/// Locates dependency manifests in a GitHub repository
#[derive(Debug)]
pub struct ManifestLocator<'a> {
    github: &'a GithubClient,
}

impl<'a> ManifestLocator<'a> {
    pub fn new(github: &'a GithubClient) -> Self {
        Self { github }
    }

    /// Probes all candidates on the resolved branch
    ///
    /// # Errors
    ///
    /// `LocateError::NoManifestsFound` when every candidate is absent; the
    /// caller must skip version sniffing and the AI call in that case.
    pub async fn locate(&self, repo: &RepoRef) -> Result<Discovery, LocateError> {
        let branch = self.github.default_branch(repo).await;
        debug!(repo = %repo, branch, "probing manifest candidates");

        let probes = CANDIDATES
            .into_iter()
            .map(|kind| {
                let branch = branch.as_str();
                async move {
                    self.github
                        .fetch_raw(repo, branch, kind.filename())
                        .await
                        .map(|content| ManifestFile::new(kind, content))
                }
                .boxed()
            })
            .collect();

        let files = probe::evaluate(ProbePolicy::ConcurrentAll, probes).await;

        if files.is_empty() {
            return Err(LocateError::NoManifestsFound);
        }

        info!(
            repo = %repo,
            branch,
            found = files.len(),
            "manifest discovery complete"
        );

        Ok(Discovery { branch, files })
    }
}
