//! Terminal rendering for scan and snapshot results
//!
//! Builds plain strings so the same renderer backs stdout and tests; ANSI
//! styling is applied only when stdout is a terminal. Issues are capped at
//! ten and vulnerabilities at five, with an overflow line pointing at
//! `--json` for the full picture.

use crate::analysis::types::{AnalysisDocument, Severity, Vulnerability};
use owo_colors::{OwoColorize, Style};
use std::fmt::Display;
use std::path::Path;

const ISSUE_DISPLAY_CAP: usize = 10;
const VULNERABILITY_DISPLAY_CAP: usize = 5;
const RULE_WIDTH: usize = 50;

/// Renders analysis results and errors for the terminal
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// A renderer that colors output when stdout is a terminal
    pub fn stdout() -> Self {
        Self {
            color: atty::is(atty::Stream::Stdout),
        }
    }

    /// A renderer that never emits ANSI codes
    pub fn plain() -> Self {
        Self { color: false }
    }

    fn paint(&self, text: impl Display, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn rule(&self) -> String {
        self.paint("\u{2500}".repeat(RULE_WIDTH), Style::new().bright_black())
    }

    fn dim(&self, text: impl Display) -> String {
        self.paint(text, Style::new().bright_black())
    }

    /// Renders a full analysis report
    pub fn render_analysis(&self, target: &str, document: &AnalysisDocument) -> String {
        let mut output = String::new();

        // Header
        output.push_str(&format!(
            "\n{}\n",
            self.paint(
                "\u{1F527} pindrift - Python Environment Analysis",
                Style::new().cyan().bold()
            )
        ));
        output.push_str(&format!("{}\n", self.rule()));

        let repo_name = target.replace("https://github.com/", "");
        output.push_str(&format!(
            "Repository: {}\n",
            self.paint(&repo_name, Style::new().cyan())
        ));

        if !document.python_version.is_empty() && document.python_version != "unknown" {
            output.push_str(&format!(
                "Python: {}\n",
                self.paint(&document.python_version, Style::new().yellow())
            ));
        }

        if !document.detected_formats.is_empty() {
            output.push_str(&format!(
                "Formats: {}\n",
                self.dim(document.detected_formats.join(", "))
            ));
        }

        output.push('\n');

        // Summary counters
        let score = document.data.reproducibility_score;
        let score_style = if score >= 80 {
            Style::new().green().bold()
        } else if score >= 50 {
            Style::new().yellow().bold()
        } else {
            Style::new().red().bold()
        };
        output.push_str(&format!(
            "\u{1F4CA} Reproducibility Score: {}\n",
            self.paint(format!("{}%", score), score_style)
        ));

        let issue_count = document.data.issues.len();
        let issue_span = if issue_count > 0 {
            self.paint(issue_count, Style::new().yellow())
        } else {
            self.paint("0", Style::new().green())
        };
        output.push_str(&format!("\u{26A0}\u{FE0F}  Issues Found: {}\n", issue_span));

        output.push_str(&format!(
            "\u{1F512} Vulnerabilities: {}\n",
            self.vulnerability_summary(&document.data.vulnerabilities)
        ));

        output.push('\n');

        // Issue list
        if !document.data.issues.is_empty() {
            output.push_str(&format!("{}\n", self.paint("Issues:", Style::new().bold())));
            for issue in document.data.issues.iter().take(ISSUE_DISPLAY_CAP) {
                let marker_style = match issue.severity {
                    Severity::High => Style::new().red(),
                    Severity::Medium => Style::new().yellow(),
                    Severity::Low => Style::new().blue(),
                };
                output.push_str(&format!(
                    "  {} {}: {} {}\n",
                    self.paint("\u{25CF}", marker_style),
                    issue.title,
                    self.paint(&issue.package, Style::new().cyan()),
                    self.dim(format!("({})", issue.severity)),
                ));
            }
            if issue_count > ISSUE_DISPLAY_CAP {
                output.push_str(&format!(
                    "  {}\n",
                    self.dim(format!(
                        "... and {} more issues",
                        issue_count - ISSUE_DISPLAY_CAP
                    ))
                ));
            }
            output.push('\n');
        }

        // Vulnerability list
        if !document.data.vulnerabilities.is_empty() {
            output.push_str(&format!(
                "{}\n",
                self.paint("Security Vulnerabilities:", Style::new().bold())
            ));
            for vuln in document
                .data
                .vulnerabilities
                .iter()
                .take(VULNERABILITY_DISPLAY_CAP)
            {
                let severity_style = match vuln.severity.as_str() {
                    "CRITICAL" => Style::new().red().bold(),
                    "HIGH" => Style::new().red(),
                    "MEDIUM" => Style::new().yellow(),
                    _ => Style::new().blue(),
                };
                output.push_str(&format!(
                    "  \u{1F534} {}: {}@{} {}\n",
                    self.paint(&vuln.id, Style::new().cyan()),
                    vuln.package,
                    vuln.version,
                    self.paint(format!("({})", vuln.severity), severity_style),
                ));
                if !vuln.fixed_versions.is_empty() {
                    output.push_str(&format!(
                        "     {}\n",
                        self.dim(format!(
                            "Fix: upgrade to {}",
                            vuln.fixed_versions.join(", ")
                        ))
                    ));
                }
            }
            let vuln_count = document.data.vulnerabilities.len();
            if vuln_count > VULNERABILITY_DISPLAY_CAP {
                output.push_str(&format!(
                    "  {}\n",
                    self.dim(format!(
                        "... and {} more vulnerabilities",
                        vuln_count - VULNERABILITY_DISPLAY_CAP
                    ))
                ));
            }
            output.push('\n');
        }

        // Suggestions
        if !document.data.suggestions.is_empty() {
            output.push_str(&format!(
                "{}\n",
                self.paint("Suggestions:", Style::new().bold())
            ));
            for suggestion in &document.data.suggestions {
                output.push_str(&format!(
                    "  {} {}\n",
                    self.paint("\u{2192}", Style::new().cyan()),
                    suggestion
                ));
            }
            output.push('\n');
        }

        // Dependency diff
        if !document.data.dependency_diff.is_empty() {
            output.push_str(&format!(
                "{}\n",
                self.paint("Dependency Changes:", Style::new().bold())
            ));
            let width = document
                .data
                .dependency_diff
                .iter()
                .map(|change| change.package.len())
                .max()
                .unwrap_or(0);
            for change in &document.data.dependency_diff {
                output.push_str(&format!(
                    "  {:width$}  {} {} {}\n",
                    change.package,
                    self.dim(&change.before),
                    self.dim("\u{2192}"),
                    self.paint(&change.after, Style::new().green()),
                    width = width,
                ));
            }
            output.push('\n');
        }

        // Footer
        output.push_str(&format!("{}\n", self.rule()));
        output.push_str(&format!(
            "{}\n",
            self.dim("\u{1F4A1} Run with --json for full output")
        ));

        output
    }

    fn vulnerability_summary(&self, vulnerabilities: &[Vulnerability]) -> String {
        if vulnerabilities.is_empty() {
            return self.paint("0", Style::new().green());
        }

        let critical = vulnerabilities
            .iter()
            .filter(|v| v.severity == "CRITICAL")
            .count();
        let high = vulnerabilities
            .iter()
            .filter(|v| v.severity == "HIGH")
            .count();

        let mut summary = self.paint(vulnerabilities.len(), Style::new().red());
        if critical > 0 {
            summary.push_str(&format!(
                " ({})",
                self.paint(format!("{} Critical", critical), Style::new().red().bold())
            ));
        } else if high > 0 {
            summary.push_str(&format!(
                " ({})",
                self.paint(format!("{} High", high), Style::new().red())
            ));
        }
        summary
    }

    /// Renders a failed scan, with a hint when the target has no manifests
    pub fn render_error(&self, message: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{}\n",
            self.paint(format!("Error: {}", message), Style::new().red())
        ));

        if message.contains("No Python dependency files") {
            output.push_str(&format!(
                "\n{}\n",
                self.paint(
                    "This repository does not appear to be a Python project.",
                    Style::new().yellow()
                )
            ));
            output.push_str(&format!(
                "{}\n",
                self.dim(
                    "pindrift requires: requirements.txt, pyproject.toml, Pipfile, or setup.py"
                )
            ));
        } else if message.contains("Cannot reach pindrift server") {
            output.push_str(&format!(
                "\n{}\n",
                self.dim("Start one locally with: pindrift serve")
            ));
        }

        output
    }

    /// Renders the confirmation after a snapshot file is written
    pub fn render_snapshot_saved(&self, path: &Path, format: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} Snapshot written to {}\n",
            self.paint("\u{2713}", Style::new().green()),
            self.paint(path.display(), Style::new().cyan())
        ));
        output.push_str(&format!("  {}\n", self.dim(format!("Format: {}", format))));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{AnalysisData, DependencyChange, Issue, IssueCategory, Severity};
    use std::path::PathBuf;

    fn vulnerability(id: &str, severity: &str, fixed: &[&str]) -> Vulnerability {
        Vulnerability {
            id: id.to_string(),
            package: "jinja2".to_string(),
            version: "2.4.1".to_string(),
            severity: severity.to_string(),
            summary: "Sandbox escape".to_string(),
            fixed_versions: fixed.iter().map(|v| v.to_string()).collect(),
            link: format!("https://osv.dev/vulnerability/{}", id),
        }
    }

    fn issue(title: &str, severity: Severity) -> Issue {
        Issue {
            title: title.to_string(),
            package: "requests".to_string(),
            severity,
            category: IssueCategory::MissingPin,
            description: "No version constraint".to_string(),
        }
    }

    fn sample_document() -> AnalysisDocument {
        AnalysisDocument {
            data: AnalysisData {
                issues: vec![issue("Missing version pin", Severity::High)],
                suggestions: vec!["Pin all dependencies".to_string()],
                dependency_diff: vec![DependencyChange {
                    package: "requests".to_string(),
                    before: "unversioned".to_string(),
                    after: "==2.31.0".to_string(),
                }],
                vulnerabilities: vec![vulnerability("GHSA-462w-v97r-4m45", "HIGH", &["2.11.3"])],
                reproducibility_score: 95,
            },
            detected_formats: vec!["Requirements.txt".to_string()],
            primary_format: "Requirements.txt".to_string(),
            python_version: "3.11".to_string(),
            python_version_source: "pyproject.toml".to_string(),
            found_files: vec![],
            raw_requirements: "requests\n".to_string(),
        }
    }

    #[test]
    fn test_render_analysis_sections() {
        let output =
            Renderer::plain().render_analysis("https://github.com/pallets/flask", &sample_document());

        assert!(output.contains("pindrift - Python Environment Analysis"));
        assert!(output.contains("Repository: pallets/flask"));
        assert!(output.contains("Python: 3.11"));
        assert!(output.contains("Formats: Requirements.txt"));
        assert!(output.contains("Reproducibility Score: 95%"));
        assert!(output.contains("Issues Found: 1"));
        assert!(output.contains("Missing version pin"));
        assert!(output.contains("GHSA-462w-v97r-4m45: jinja2@2.4.1 (HIGH)"));
        assert!(output.contains("Fix: upgrade to 2.11.3"));
        assert!(output.contains("Suggestions:"));
        assert!(output.contains("Pin all dependencies"));
        assert!(output.contains("Dependency Changes:"));
        assert!(output.contains("Run with --json for full output"));
    }

    #[test]
    fn test_unknown_python_version_hidden() {
        let mut document = sample_document();
        document.python_version = "unknown".to_string();

        let output = Renderer::plain().render_analysis("https://github.com/a/b", &document);
        assert!(!output.contains("Python:"));
    }

    #[test]
    fn test_issue_overflow_line() {
        let mut document = sample_document();
        document.data.issues = (0..12)
            .map(|i| issue(&format!("Issue {}", i), Severity::Low))
            .collect();

        let output = Renderer::plain().render_analysis("https://github.com/a/b", &document);
        assert!(output.contains("... and 2 more issues"));
        assert!(output.contains("Issue 9"));
        assert!(!output.contains("Issue 10"));
    }

    #[test]
    fn test_vulnerability_overflow_line() {
        let mut document = sample_document();
        document.data.vulnerabilities = (0..7)
            .map(|i| vulnerability(&format!("GHSA-{}", i), "MEDIUM", &[]))
            .collect();

        let output = Renderer::plain().render_analysis("https://github.com/a/b", &document);
        assert!(output.contains("... and 2 more vulnerabilities"));
    }

    #[test]
    fn test_critical_count_in_summary() {
        let mut document = sample_document();
        document.data.vulnerabilities = vec![
            vulnerability("GHSA-1", "CRITICAL", &[]),
            vulnerability("GHSA-2", "HIGH", &[]),
        ];

        let output = Renderer::plain().render_analysis("https://github.com/a/b", &document);
        assert!(output.contains("Vulnerabilities: 2 (1 Critical)"));
    }

    #[test]
    fn test_fix_line_omitted_without_fixed_versions() {
        let mut document = sample_document();
        document.data.vulnerabilities = vec![vulnerability("GHSA-1", "LOW", &[])];

        let output = Renderer::plain().render_analysis("https://github.com/a/b", &document);
        assert!(!output.contains("Fix: upgrade to"));
    }

    #[test]
    fn test_zero_counts_render() {
        let mut document = sample_document();
        document.data.issues.clear();
        document.data.vulnerabilities.clear();

        let output = Renderer::plain().render_analysis("https://github.com/a/b", &document);
        assert!(output.contains("Issues Found: 0"));
        assert!(output.contains("Vulnerabilities: 0"));
        assert!(!output.contains("Issues:\n"));
        assert!(!output.contains("Security Vulnerabilities:"));
    }

    #[test]
    fn test_render_error_with_manifest_hint() {
        let output = Renderer::plain().render_error(
            "No Python dependency files found (requirements.txt, pyproject.toml, Pipfile, or setup.py)",
        );

        assert!(output.contains("Error: No Python dependency files found"));
        assert!(output.contains("does not appear to be a Python project"));
        assert!(output.contains("pindrift requires: requirements.txt"));
    }

    #[test]
    fn test_render_error_without_hint() {
        let output = Renderer::plain().render_error("Invalid GitHub URL format");

        assert!(output.contains("Error: Invalid GitHub URL format"));
        assert!(!output.contains("does not appear to be a Python project"));
        assert!(!output.contains("pindrift serve"));
    }

    #[test]
    fn test_render_error_with_server_hint() {
        let output = Renderer::plain()
            .render_error("Cannot reach pindrift server at http://127.0.0.1:8787: connection refused");

        assert!(output.contains("Start one locally with: pindrift serve"));
    }

    #[test]
    fn test_render_snapshot_saved() {
        let output = Renderer::plain()
            .render_snapshot_saved(&PathBuf::from("environment.zfix"), "requirements.txt");

        assert!(output.contains("Snapshot written to environment.zfix"));
        assert!(output.contains("Format: requirements.txt"));
    }

    #[test]
    fn test_plain_renderer_has_no_ansi() {
        let output =
            Renderer::plain().render_analysis("https://github.com/pallets/flask", &sample_document());
        assert!(!output.contains('\u{1b}'));
    }
}
