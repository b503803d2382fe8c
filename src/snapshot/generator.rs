//! Corrected-manifest snapshot generation
//!
//! Drives the second AI call and assembles the `.zfix` document around the
//! reply. The generator is provider-agnostic over `CompletionBackend`, so
//! tests run against the mock and production runs against the gateway.

use crate::ai::{BackendError, ChatRequest, CompletionBackend};
use crate::snapshot::prompt::{build_snapshot_prompt, OutputFormat, SNAPSHOT_SYSTEM_PROMPT};
use crate::snapshot::types::{
    SnapshotRequest, SnapshotResponse, ZfixAnalysis, ZfixChange, ZfixDocument,
    ZfixFixedDependencies, ZfixIssue, ZfixMetadata, ZfixVulnerability,
};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

/// Download name for the generated document
pub const SNAPSHOT_FILENAME: &str = "environment.zfix";

/// Generates `.zfix` snapshots from finished analyses
pub struct SnapshotGenerator {
    backend: Arc<dyn CompletionBackend>,
}

impl SnapshotGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Runs the snapshot call and wraps the reply in a `.zfix` document
    ///
    /// # Errors
    ///
    /// Propagates `BackendError` from the AI call; callers map rate-limit
    /// and payment failures to their user-facing messages.
    pub async fn generate(
        &self,
        request: &SnapshotRequest,
    ) -> Result<SnapshotResponse, BackendError> {
        let format = OutputFormat::from_primary_format(&request.primary_format);
        info!(
            repo = %request.repository_url,
            format = format.filename(),
            vulnerabilities = request.vulnerabilities.len(),
            "generating dependency snapshot"
        );

        let prompt = build_snapshot_prompt(request, format);
        let reply = self
            .backend
            .complete(ChatRequest::new(SNAPSHOT_SYSTEM_PROMPT, prompt))
            .await?;

        let fixed_content = strip_markdown_fences(&reply);
        debug!(
            preview = %fixed_content.chars().take(200).collect::<String>(),
            "generated file preview"
        );

        let zfix_data = assemble_document(request, format, fixed_content.clone());

        Ok(SnapshotResponse {
            success: true,
            zfix_data,
            fixed_content,
            filename: SNAPSHOT_FILENAME.to_string(),
            format: ".zfix".to_string(),
        })
    }
}

/// Removes markdown code fences the model sometimes wraps replies in
fn strip_markdown_fences(reply: &str) -> String {
    let fence = Regex::new(r"(?i)```[a-z]*\n?").expect("valid fence pattern");
    fence.replace_all(reply, "").trim().to_string()
}

fn assemble_document(
    request: &SnapshotRequest,
    format: OutputFormat,
    fixed_content: String,
) -> ZfixDocument {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let or_unknown = |value: &str| {
        if value.is_empty() {
            "unknown".to_string()
        } else {
            value.to_string()
        }
    };

    let primary_format = if request.primary_format.is_empty() {
        format.filename().to_string()
    } else {
        request.primary_format.clone()
    };

    ZfixDocument {
        version: "1.0".to_string(),
        generated_at: timestamp.clone(),
        generator: crate::NAME.to_string(),
        metadata: ZfixMetadata {
            repository_url: or_unknown(&request.repository_url),
            python_version: or_unknown(&request.python_version),
            detected_formats: request.detected_formats.clone(),
            primary_format,
            scan_timestamp: timestamp,
        },
        analysis: ZfixAnalysis {
            reproducibility_score: request.reproducibility_score,
            total_issues: request.issues.len(),
            issues: request.issues.iter().map(ZfixIssue::from).collect(),
            suggestions: request.suggestions.clone(),
            dependency_changes: request
                .dependency_diff
                .iter()
                .map(ZfixChange::from)
                .collect(),
            vulnerabilities: request
                .vulnerabilities
                .iter()
                .map(ZfixVulnerability::from)
                .collect(),
            vulnerability_count: request.vulnerabilities.len(),
        },
        fixed_dependencies: ZfixFixedDependencies {
            format: format.filename().to_string(),
            content: fixed_content,
        },
    }
}
