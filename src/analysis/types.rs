//! Analysis domain types
//!
//! These are the typed forms of what the model reports: issues with a
//! severity and category drawn from closed vocabularies, free-text
//! suggestions, and a dependency diff whose `before` field drives the
//! pinning arithmetic. Wire names stay camelCase for compatibility with the
//! existing result consumers.

use crate::manifest::{Discovery, DetectedVersion};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel value in a diff entry meaning "no version constraint at all"
pub const UNVERSIONED: &str = "unversioned";

/// Issue severity, strictly one of three values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Parses the wire value; anything outside the vocabulary is rejected
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue category, strictly one of three values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    MissingPin,
    Conflict,
    Outdated,
}

impl IssueCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "missing_pin" => Some(IssueCategory::MissingPin),
            "conflict" => Some(IssueCategory::Conflict),
            "outdated" => Some(IssueCategory::Outdated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::MissingPin => "missing_pin",
            IssueCategory::Conflict => "conflict",
            IssueCategory::Outdated => "outdated",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem the model found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    pub package: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub description: String,
}

/// One entry of the proposed dependency diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyChange {
    pub package: String,
    /// Current constraint, or the "unversioned" sentinel
    pub before: String,
    /// Proposed constraint
    pub after: String,
}

impl DependencyChange {
    /// A package counts as pinned when it carries any constraint at all
    pub fn is_pinned(&self) -> bool {
        self.before != UNVERSIONED
    }
}

/// One known vulnerability affecting a pinned package
///
/// Wire names stay as-is: vulnerability objects keep `fixed_versions`
/// snake_case even inside the otherwise-camelCase analysis payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub package: String,
    pub version: String,
    pub severity: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub fixed_versions: Vec<String>,
    pub link: String,
}

/// The validated model reply plus derived score and vulnerabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
    pub dependency_diff: Vec<DependencyChange>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    pub reproducibility_score: u8,
}

/// A discovered file as surfaced to result consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundFile {
    pub name: String,
    pub format: String,
}

/// The complete result of one analysis, as cached and as returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDocument {
    pub data: AnalysisData,
    pub detected_formats: Vec<String>,
    pub primary_format: String,
    pub python_version: String,
    pub python_version_source: String,
    pub found_files: Vec<FoundFile>,
    /// Content of the highest-priority discovered file
    pub raw_requirements: String,
}

impl AnalysisDocument {
    /// Assembles a document from discovery facts and a finished analysis
    pub fn assemble(
        discovery: &Discovery,
        version: &DetectedVersion,
        data: AnalysisData,
    ) -> Self {
        Self {
            data,
            detected_formats: discovery
                .detected_formats()
                .into_iter()
                .map(String::from)
                .collect(),
            primary_format: discovery.primary_format().unwrap_or_default().to_string(),
            python_version: version.version.clone(),
            python_version_source: version.source.clone(),
            found_files: discovery
                .files
                .iter()
                .map(|f| FoundFile {
                    name: f.name().to_string(),
                    format: f.kind.label().to_string(),
                })
                .collect(),
            raw_requirements: discovery
                .primary_file()
                .map(|f| f.content.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestFile, ManifestKind};

    #[test]
    fn test_severity_vocabulary() {
        assert_eq!(Severity::parse("high"), Some(Severity::High));
        assert_eq!(Severity::parse("medium"), Some(Severity::Medium));
        assert_eq!(Severity::parse("low"), Some(Severity::Low));
        assert_eq!(Severity::parse("critical"), None);
        assert_eq!(Severity::parse("HIGH"), None);
    }

    #[test]
    fn test_category_vocabulary() {
        assert_eq!(IssueCategory::parse("missing_pin"), Some(IssueCategory::MissingPin));
        assert_eq!(IssueCategory::parse("conflict"), Some(IssueCategory::Conflict));
        assert_eq!(IssueCategory::parse("outdated"), Some(IssueCategory::Outdated));
        assert_eq!(IssueCategory::parse("vulnerability"), None);
    }

    #[test]
    fn test_severity_serde_round_trip() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let back: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, Severity::Medium);
    }

    #[test]
    fn test_category_serde_uses_snake_case() {
        let json = serde_json::to_string(&IssueCategory::MissingPin).unwrap();
        assert_eq!(json, "\"missing_pin\"");
    }

    #[test]
    fn test_is_pinned() {
        let pinned = DependencyChange {
            package: "pandas".to_string(),
            before: "1.3.0".to_string(),
            after: "1.3.0".to_string(),
        };
        let unpinned = DependencyChange {
            package: "numpy".to_string(),
            before: UNVERSIONED.to_string(),
            after: "1.26.2".to_string(),
        };
        assert!(pinned.is_pinned());
        assert!(!unpinned.is_pinned());
    }

    #[test]
    fn test_analysis_data_wire_names() {
        let data = AnalysisData {
            issues: vec![],
            suggestions: vec!["Pin numpy".to_string()],
            dependency_diff: vec![],
            vulnerabilities: vec![],
            reproducibility_score: 90,
        };
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"dependencyDiff\""));
        assert!(json.contains("\"reproducibilityScore\":90"));
    }

    #[test]
    fn test_document_assemble() {
        let discovery = Discovery {
            branch: "master".to_string(),
            files: vec![ManifestFile::new(ManifestKind::Pip, "numpy\npandas==1.3.0")],
        };
        let version = DetectedVersion::not_detected();
        let data = AnalysisData {
            issues: vec![],
            suggestions: vec![],
            dependency_diff: vec![],
            vulnerabilities: vec![],
            reproducibility_score: 90,
        };

        let doc = AnalysisDocument::assemble(&discovery, &version, data);

        assert_eq!(doc.detected_formats, vec!["Requirements.txt"]);
        assert_eq!(doc.primary_format, "Requirements.txt");
        assert_eq!(doc.python_version, "unknown");
        assert_eq!(doc.python_version_source, "not detected");
        assert_eq!(doc.found_files.len(), 1);
        assert_eq!(doc.found_files[0].name, "requirements.txt");
        assert_eq!(doc.raw_requirements, "numpy\npandas==1.3.0");
    }
}
