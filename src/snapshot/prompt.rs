//! Snapshot prompt assembly
//!
//! The second AI call of the pipeline: given a finished analysis, ask the
//! model for the complete corrected manifest in the repository's native
//! dialect. The prompt demands raw file content (no markdown, no prose) so
//! the reply can be written to disk after fence stripping.

use crate::snapshot::types::SnapshotRequest;
use chrono::Utc;
use std::fmt;

/// System message for the snapshot call
pub const SNAPSHOT_SYSTEM_PROMPT: &str = "You are a Python dependency expert. \
Generate corrected dependency files without any markdown formatting or explanations.";

/// Target manifest dialect for the corrected file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Requirements,
    Pyproject,
    Pipfile,
}

impl OutputFormat {
    /// Chooses the dialect from the analysis' primary format label.
    ///
    /// Poetry formats (including lockfiles) map to `pyproject.toml`, Pipenv
    /// formats to `Pipfile`, and everything else falls back to
    /// `requirements.txt`.
    pub fn from_primary_format(label: &str) -> Self {
        if label.contains("Poetry") || label.contains("pyproject.toml") {
            OutputFormat::Pyproject
        } else if label.contains("Pipenv") || label.contains("Pipfile") {
            OutputFormat::Pipfile
        } else {
            OutputFormat::Requirements
        }
    }

    /// Canonical filename of the dialect, as named in the prompt
    pub fn filename(&self) -> &'static str {
        match self {
            OutputFormat::Requirements => "requirements.txt",
            OutputFormat::Pyproject => "pyproject.toml",
            OutputFormat::Pipfile => "Pipfile",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Requirements => "txt",
            OutputFormat::Pyproject => "toml",
            OutputFormat::Pipfile => "pipfile",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

/// Builds the snapshot prompt from a request and the chosen output dialect
pub fn build_snapshot_prompt(request: &SnapshotRequest, format: OutputFormat) -> String {
    let today = Utc::now().format("%Y-%m-%d").to_string();

    let issues_summary = request
        .issues
        .iter()
        .map(|issue| format!("- {} ({}): {}", issue.title, issue.package, issue.description))
        .collect::<Vec<_>>()
        .join("\n");

    let suggestions_text = request.suggestions.join("\n- ");

    let dependencies_text = request
        .dependency_diff
        .iter()
        .map(|dep| format!("{}: {} → {}", dep.package, dep.before, dep.after))
        .collect::<Vec<_>>()
        .join("\n");

    let vulnerabilities_text = if request.vulnerabilities.is_empty() {
        String::new()
    } else {
        let lines = request
            .vulnerabilities
            .iter()
            .map(|vuln| {
                let fix = if vuln.fixed_versions.is_empty() {
                    String::new()
                } else {
                    format!(" - Fix: upgrade to {}", vuln.fixed_versions.join(", "))
                };
                format!(
                    "- {}: {}@{} ({}){}",
                    vuln.id, vuln.package, vuln.version, vuln.severity, fix
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "\n\nSECURITY VULNERABILITIES ({}):\n{}",
            request.vulnerabilities.len(),
            lines
        )
    };

    let python = request.python_version.as_str();
    let python_known = !python.is_empty() && python != "unknown";
    let python_or_latest = if python.is_empty() { "latest stable" } else { python };

    let python_version_text = if python_known {
        format!(
            "\n\nTARGET PYTHON VERSION: {python}\n\
             Ensure all packages are compatible with Python {python}."
        )
    } else {
        String::new()
    };

    let original_dependencies_text = if request.raw_requirements.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nORIGINAL DEPENDENCIES FILE:\n{}\n\n\
             Include ALL of these dependencies in your output, applying fixes where needed.",
            request.raw_requirements
        )
    };

    let poetry_skeleton = if format == OutputFormat::Pyproject {
        let python_constraint = if python_known { python } else { "^3.11" };
        format!(
            r#"
For Poetry projects, use this structure with inline comments:
# Auto-fixed by pindrift - {today}

[tool.poetry]
name = "project"
version = "0.1.0"
description = ""
authors = []

[tool.poetry.dependencies]
python = "{python_constraint}"
# Add all dependencies here with inline comments explaining each fix
# Example: numpy = "^1.26.2"  # Fixed: was unversioned, pinned to latest stable

[build-system]
requires = ["poetry-core"]
build-backend = "poetry.core.masonry.api"
"#
        )
    } else {
        String::new()
    };

    let pipfile_skeleton = if format == OutputFormat::Pipfile {
        let python_minor = if python_known {
            python.split('.').take(2).collect::<Vec<_>>().join(".")
        } else {
            "3.11".to_string()
        };
        format!(
            r#"
For Pipenv projects, use this structure with inline comments:
# Auto-fixed by pindrift - {today}

[[source]]
url = "https://pypi.org/simple"
verify_ssl = true
name = "pypi"

[packages]
# Add all dependencies here with inline comments explaining each fix
# Example: numpy = "==1.26.2"  # Fixed: was unversioned, pinned to latest stable

[dev-packages]

[requires]
python_version = "{python_minor}"
"#
        )
    } else {
        String::new()
    };

    format!(
        r#"You are a Python dependency expert. Generate a COMPLETE, production-ready dependency file with inline comments explaining each fix.

OUTPUT FORMAT: {format}
{python_version_text}
{original_dependencies_text}

DETECTED ISSUES:
{issues_summary}

AI SUGGESTIONS:
- {suggestions_text}

DEPENDENCY CORRECTIONS:
{dependencies_text}
{vulnerabilities_text}

CRITICAL INSTRUCTIONS:
1. Generate a COMPLETE {format} file including ALL dependencies (not just the ones with issues)
2. For EACH dependency, add an inline comment explaining:
   - If it was fixed: what was wrong and why this version was chosen
   - If it has a security vulnerability: note the CVE and the fix
   - If it was unchanged: confirm it's already correct
3. Use the "after" versions from the dependency corrections
4. Pin ALL dependencies to specific versions (no unpinned packages)
5. Ensure compatibility with Python {python_or_latest}
6. Follow {format} best practices and syntax
7. Add a header comment explaining this is an auto-fixed file
8. If there are security vulnerabilities, prioritize upgrading to fixed versions

EXAMPLE FORMAT for requirements.txt:
# Auto-fixed by pindrift - {today}
# Python version: {python_or_latest}

numpy==1.26.2  # Fixed: was unversioned, pinned to latest stable
pandas==2.1.0  # Fixed: was 1.5.3, upgraded for Python 3.11 compatibility
requests==2.31.0  # Security: upgraded from 2.28.0 to fix CVE-2023-32681

{poetry_skeleton}

{pipfile_skeleton}

CRITICAL: Respond with ONLY the complete file content with inline comments. No explanations, no markdown code blocks, just the raw file content that can be saved directly. Include ALL dependencies from the original file plus any fixes."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DependencyChange, Issue, IssueCategory, Severity, Vulnerability};

    fn sample_request() -> SnapshotRequest {
        SnapshotRequest {
            issues: vec![Issue {
                title: "Unpinned dependency".to_string(),
                package: "numpy".to_string(),
                severity: Severity::High,
                category: IssueCategory::MissingPin,
                description: "numpy has no version constraint".to_string(),
            }],
            suggestions: vec![
                "Pin numpy to a specific version".to_string(),
                "Add a lockfile".to_string(),
            ],
            dependency_diff: vec![DependencyChange {
                package: "pandas".to_string(),
                before: "1.5.3".to_string(),
                after: "2.1.0".to_string(),
            }],
            vulnerabilities: vec![],
            detected_formats: vec!["Requirements.txt".to_string()],
            primary_format: "Requirements.txt".to_string(),
            python_version: "3.11".to_string(),
            raw_requirements: "numpy\npandas==1.5.3".to_string(),
            repository_url: "https://github.com/psf/requests".to_string(),
            reproducibility_score: 65,
        }
    }

    #[test]
    fn test_format_selection_from_primary_label() {
        assert_eq!(
            OutputFormat::from_primary_format("Poetry (pyproject.toml)"),
            OutputFormat::Pyproject
        );
        assert_eq!(
            OutputFormat::from_primary_format("Poetry Lock"),
            OutputFormat::Pyproject
        );
        assert_eq!(
            OutputFormat::from_primary_format("Pipenv"),
            OutputFormat::Pipfile
        );
        assert_eq!(
            OutputFormat::from_primary_format("Pipenv Lock"),
            OutputFormat::Pipfile
        );
        assert_eq!(
            OutputFormat::from_primary_format("Requirements.txt"),
            OutputFormat::Requirements
        );
        assert_eq!(
            OutputFormat::from_primary_format(""),
            OutputFormat::Requirements
        );
    }

    #[test]
    fn test_format_filenames_and_extensions() {
        assert_eq!(OutputFormat::Requirements.filename(), "requirements.txt");
        assert_eq!(OutputFormat::Requirements.extension(), "txt");
        assert_eq!(OutputFormat::Pyproject.filename(), "pyproject.toml");
        assert_eq!(OutputFormat::Pyproject.extension(), "toml");
        assert_eq!(OutputFormat::Pipfile.filename(), "Pipfile");
        assert_eq!(OutputFormat::Pipfile.extension(), "pipfile");
    }

    #[test]
    fn test_prompt_lists_issues_and_corrections() {
        let prompt = build_snapshot_prompt(&sample_request(), OutputFormat::Requirements);
        assert!(prompt.contains("OUTPUT FORMAT: requirements.txt"));
        assert!(prompt.contains("- Unpinned dependency (numpy): numpy has no version constraint"));
        assert!(prompt.contains("pandas: 1.5.3 → 2.1.0"));
        assert!(prompt.contains("- Pin numpy to a specific version\n- Add a lockfile"));
    }

    #[test]
    fn test_prompt_includes_original_file_block() {
        let prompt = build_snapshot_prompt(&sample_request(), OutputFormat::Requirements);
        assert!(prompt.contains("ORIGINAL DEPENDENCIES FILE:\nnumpy\npandas==1.5.3"));
        assert!(prompt.contains("Include ALL of these dependencies in your output"));
    }

    #[test]
    fn test_prompt_python_version_block() {
        let prompt = build_snapshot_prompt(&sample_request(), OutputFormat::Requirements);
        assert!(prompt.contains("TARGET PYTHON VERSION: 3.11"));
        assert!(prompt.contains("compatible with Python 3.11."));

        let mut unknown = sample_request();
        unknown.python_version = "unknown".to_string();
        let prompt = build_snapshot_prompt(&unknown, OutputFormat::Requirements);
        assert!(!prompt.contains("TARGET PYTHON VERSION"));

        let mut empty = sample_request();
        empty.python_version = String::new();
        let prompt = build_snapshot_prompt(&empty, OutputFormat::Requirements);
        assert!(prompt.contains("Ensure compatibility with Python latest stable"));
    }

    #[test]
    fn test_prompt_vulnerabilities_block() {
        let mut request = sample_request();
        request.vulnerabilities = vec![Vulnerability {
            id: "GHSA-j8r2-6x86-q33q".to_string(),
            package: "requests".to_string(),
            version: "2.28.0".to_string(),
            severity: "HIGH".to_string(),
            summary: "Proxy-Authorization leak".to_string(),
            fixed_versions: vec!["2.31.0".to_string()],
            link: "https://osv.dev/vulnerability/GHSA-j8r2-6x86-q33q".to_string(),
        }];
        let prompt = build_snapshot_prompt(&request, OutputFormat::Requirements);
        assert!(prompt.contains("SECURITY VULNERABILITIES (1):"));
        assert!(prompt.contains(
            "- GHSA-j8r2-6x86-q33q: requests@2.28.0 (HIGH) - Fix: upgrade to 2.31.0"
        ));

        let prompt = build_snapshot_prompt(&sample_request(), OutputFormat::Requirements);
        assert!(!prompt.contains("SECURITY VULNERABILITIES"));
    }

    #[test]
    fn test_poetry_skeleton_only_for_pyproject() {
        let prompt = build_snapshot_prompt(&sample_request(), OutputFormat::Pyproject);
        assert!(prompt.contains("[tool.poetry]"));
        assert!(prompt.contains("python = \"3.11\""));
        assert!(prompt.contains("build-backend = \"poetry.core.masonry.api\""));

        let prompt = build_snapshot_prompt(&sample_request(), OutputFormat::Requirements);
        assert!(!prompt.contains("[tool.poetry]"));
    }

    #[test]
    fn test_pipfile_skeleton_uses_minor_python_version() {
        let mut request = sample_request();
        request.python_version = "3.11.5".to_string();
        let prompt = build_snapshot_prompt(&request, OutputFormat::Pipfile);
        assert!(prompt.contains("[[source]]"));
        assert!(prompt.contains("python_version = \"3.11\""));

        request.python_version = "unknown".to_string();
        let prompt = build_snapshot_prompt(&request, OutputFormat::Pipfile);
        assert!(prompt.contains("python_version = \"3.11\""));
    }

    #[test]
    fn test_prompt_demands_raw_file_content() {
        let prompt = build_snapshot_prompt(&sample_request(), OutputFormat::Requirements);
        assert!(prompt.contains("CRITICAL: Respond with ONLY the complete file content"));
        assert!(prompt.contains("No explanations, no markdown code blocks"));
        assert!(SNAPSHOT_SYSTEM_PROMPT.contains("without any markdown formatting"));
    }
}
