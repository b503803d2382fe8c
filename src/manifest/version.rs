//! Python version sniffing
//!
//! Order of precedence: a `python = "..."` assignment inside an
//! already-fetched `pyproject.toml` always wins; only when that yields
//! nothing are the auxiliary sources probed, sequentially, stopping at the
//! first match. No match anywhere produces the "unknown"/"not detected"
//! sentinel, which is a valid result rather than an error.

use crate::github::{GithubClient, RepoRef};
use crate::manifest::probe::{self, ProbePolicy};
use crate::manifest::types::{DetectedVersion, ManifestFile, ManifestKind};
use futures_util::FutureExt;
use regex::Regex;
use tracing::debug;

/// One auxiliary probe target: the path fetched and the pattern applied
#[derive(Debug, Clone, Copy)]
pub struct AuxProbe {
    pub path: &'static str,
    pub pattern: &'static str,
}

const WORKFLOW_PATTERN: &str = r#"(?i)python-version:\s*['"]?(\d+\.\d+\.?\d*)['"]?"#;

/// Auxiliary sources in probe order
pub const AUX_PROBES: [AuxProbe; 5] = [
    AuxProbe {
        path: ".python-version",
        pattern: r"(\d+\.\d+\.?\d*)",
    },
    AuxProbe {
        path: "runtime.txt",
        pattern: r"(?i)python-(\d+\.\d+\.?\d*)",
    },
    AuxProbe {
        path: ".github/workflows/ci.yml",
        pattern: WORKFLOW_PATTERN,
    },
    AuxProbe {
        path: ".github/workflows/main.yml",
        pattern: WORKFLOW_PATTERN,
    },
    AuxProbe {
        path: ".github/workflows/test.yml",
        pattern: WORKFLOW_PATTERN,
    },
];

fn capture(pattern: &str, content: &str) -> Option<String> {
    let re = Regex::new(pattern).expect("valid version pattern");
    re.captures(content).map(|c| c[1].to_string())
}

/// Extracts a version constraint from `pyproject.toml` content
pub fn from_pyproject(content: &str) -> Option<String> {
    capture(r#"python\s*=\s*["']([^"']+)["']"#, content)
}

/// Applies the auxiliary pattern registered for `path`, if any
pub fn from_aux_file(path: &str, content: &str) -> Option<String> {
    AUX_PROBES
        .iter()
        .find(|probe| probe.path == path)
        .and_then(|probe| capture(probe.pattern, content))
}

/// Sniffs the Python version for a repository
#[derive(Debug)]
pub struct VersionSniffer<'a> {
    github: &'a GithubClient,
}

impl<'a> VersionSniffer<'a> {
    pub fn new(github: &'a GithubClient) -> Self {
        Self { github }
    }

    /// Checks pyproject first, then walks the auxiliary probes with early
    /// exit. Once pyproject matches, no auxiliary fetch is ever issued.
    pub async fn sniff(
        &self,
        repo: &RepoRef,
        branch: &str,
        files: &[ManifestFile],
    ) -> DetectedVersion {
        if let Some(pyproject) = files.iter().find(|f| f.kind == ManifestKind::Poetry) {
            if let Some(version) = from_pyproject(&pyproject.content) {
                debug!(version, "python version from pyproject.toml");
                return DetectedVersion::new(version, "pyproject.toml");
            }
        }

        let probes = AUX_PROBES
            .into_iter()
            .map(|aux| {
                async move {
                    let content = self.github.fetch_raw(repo, branch, aux.path).await?;
                    let version = capture(aux.pattern, &content)?;
                    debug!(version, source = aux.path, "python version from auxiliary file");
                    Some(DetectedVersion::new(version, aux.path))
                }
                .boxed()
            })
            .collect();

        probe::evaluate(ProbePolicy::SequentialFirstMatch, probes)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(DetectedVersion::not_detected)
    }
}
