//! Snapshot request and `.zfix` document types
//!
//! The request mirrors the analysis payload field-for-field (camelCase on
//! the wire); the `.zfix` document is a self-contained snake_case JSON
//! record bundling the analysis summary with the corrected manifest, meant
//! to be written to disk as `environment.zfix`.

use crate::analysis::{
    AnalysisDocument, DependencyChange, Issue, Severity, Vulnerability,
};
use serde::{Deserialize, Serialize};

/// Reason attached to a dependency change when none was recorded
pub const DEFAULT_CHANGE_REASON: &str = "Version correction applied";

/// Everything the snapshot generator needs from a finished analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub dependency_diff: Vec<DependencyChange>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub detected_formats: Vec<String>,
    #[serde(default)]
    pub primary_format: String,
    #[serde(default)]
    pub python_version: String,
    #[serde(default)]
    pub raw_requirements: String,
    #[serde(default)]
    pub repository_url: String,
    #[serde(default)]
    pub reproducibility_score: u8,
}

impl SnapshotRequest {
    /// Builds a request from a scan result plus the repository it came from
    pub fn from_document(document: &AnalysisDocument, repository_url: &str) -> Self {
        Self {
            issues: document.data.issues.clone(),
            suggestions: document.data.suggestions.clone(),
            dependency_diff: document.data.dependency_diff.clone(),
            vulnerabilities: document.data.vulnerabilities.clone(),
            detected_formats: document.detected_formats.clone(),
            primary_format: document.primary_format.clone(),
            python_version: document.python_version.clone(),
            raw_requirements: document.raw_requirements.clone(),
            repository_url: repository_url.to_string(),
            reproducibility_score: document.data.reproducibility_score,
        }
    }
}

/// The `.zfix` document: analysis summary plus the corrected manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZfixDocument {
    pub version: String,
    pub generated_at: String,
    pub generator: String,
    pub metadata: ZfixMetadata,
    pub analysis: ZfixAnalysis,
    pub fixed_dependencies: ZfixFixedDependencies,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZfixMetadata {
    pub repository_url: String,
    pub python_version: String,
    pub detected_formats: Vec<String>,
    pub primary_format: String,
    pub scan_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZfixAnalysis {
    pub reproducibility_score: u8,
    pub total_issues: usize,
    pub issues: Vec<ZfixIssue>,
    pub suggestions: Vec<String>,
    pub dependency_changes: Vec<ZfixChange>,
    pub vulnerabilities: Vec<ZfixVulnerability>,
    pub vulnerability_count: usize,
}

/// Issue as recorded in the document; the category is not carried over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZfixIssue {
    pub severity: Severity,
    pub title: String,
    pub package: String,
    pub description: String,
}

impl From<&Issue> for ZfixIssue {
    fn from(issue: &Issue) -> Self {
        Self {
            severity: issue.severity,
            title: issue.title.clone(),
            package: issue.package.clone(),
            description: issue.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZfixChange {
    pub package: String,
    pub before: String,
    pub after: String,
    pub reason: String,
}

impl From<&DependencyChange> for ZfixChange {
    fn from(change: &DependencyChange) -> Self {
        Self {
            package: change.package.clone(),
            before: change.before.clone(),
            after: change.after.clone(),
            reason: DEFAULT_CHANGE_REASON.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZfixVulnerability {
    pub id: String,
    pub package: String,
    pub version: String,
    pub severity: String,
    pub summary: String,
    pub fixed_versions: Vec<String>,
    pub link: String,
}

impl From<&Vulnerability> for ZfixVulnerability {
    fn from(vuln: &Vulnerability) -> Self {
        Self {
            id: vuln.id.clone(),
            package: vuln.package.clone(),
            version: vuln.version.clone(),
            severity: vuln.severity.clone(),
            summary: vuln.summary.clone(),
            fixed_versions: vuln.fixed_versions.clone(),
            link: vuln.link.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZfixFixedDependencies {
    pub format: String,
    pub content: String,
}

/// Wire response for a successful snapshot call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub success: bool,
    pub zfix_data: ZfixDocument,
    pub fixed_content: String,
    pub filename: String,
    pub format: String,
}
