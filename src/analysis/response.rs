//! Model reply interpretation
//!
//! Two stages with distinct failure types. First the raw reply is stripped
//! of markdown code fences and parsed as JSON: failures here are
//! [`ParseError`]s. Then the parsed value is checked against the reply
//! schema before anything downstream consumes a field: wrong shapes, missing
//! fields, and values outside the severity/category vocabularies are
//! [`ValidationError`]s. The model is never trusted to emit a well-formed
//! reply.

use crate::analysis::types::{DependencyChange, Issue, IssueCategory, Severity};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Reply text that is not JSON at all
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Model reply was empty")]
    EmptyReply,
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

/// JSON that does not match the reply schema
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Field '{0}' is not an array")]
    NotAnArray(String),
    #[error("Field '{0}' must be a string")]
    NotAString(String),
    #[error("Field '{0}' must be a non-empty string")]
    EmptyField(String),
    #[error("Unknown severity '{0}' (expected high, medium, or low)")]
    UnknownSeverity(String),
    #[error("Unknown category '{0}' (expected missing_pin, conflict, or outdated)")]
    UnknownCategory(String),
}

/// Either stage failing, kept distinguishable for callers
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The validated reply: typed issues, suggestions in model order, and the
/// proposed diff
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReply {
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
    pub dependency_diff: Vec<DependencyChange>,
}

/// Removes markdown code-fence markers anywhere in the text
///
/// Plain replies pass through untouched; a reply wrapped in ```` ```json
/// ```` fences yields the identical inner text.
pub fn strip_code_fences(raw: &str) -> String {
    let re = Regex::new(r"```(?:json)?\s*").expect("valid fence pattern");
    re.replace_all(raw, "").trim().to_string()
}

/// Interprets a raw model reply into a validated [`AnalysisReply`]
pub fn interpret_reply(raw: &str) -> Result<AnalysisReply, InterpretError> {
    let cleaned = strip_code_fences(raw);
    debug!(chars = cleaned.len(), "interpreting model reply");

    if cleaned.is_empty() {
        return Err(ParseError::EmptyReply.into());
    }

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        warn!(error = %e, "model reply is not valid JSON");
        ParseError::InvalidJson(format!(
            "{}: {}",
            e,
            cleaned.chars().take(100).collect::<String>()
        ))
    })?;

    Ok(validate_reply(&value)?)
}

/// Schema validation, run on every reply before any field is used
pub fn validate_reply(value: &Value) -> Result<AnalysisReply, ValidationError> {
    let issues = elements(value, "issues")?
        .iter()
        .enumerate()
        .map(|(index, entry)| validate_issue(entry, index))
        .collect::<Result<Vec<_>, _>>()?;

    let suggestions = elements(value, "suggestions")?
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .as_str()
                .map(String::from)
                .ok_or_else(|| ValidationError::NotAString(format!("suggestions[{}]", index)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let dependency_diff = elements(value, "dependencyDiff")?
        .iter()
        .enumerate()
        .map(|(index, entry)| validate_diff_entry(entry, index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisReply {
        issues,
        suggestions,
        dependency_diff,
    })
}

/// An absent field defaults to empty; a present non-array is an error
fn elements<'v>(value: &'v Value, field: &str) -> Result<&'v [Value], ValidationError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ValidationError::NotAnArray(field.to_string())),
    }
}

fn string_field(entry: &Value, path: String) -> Result<String, ValidationError> {
    match entry {
        Value::Null => Err(ValidationError::MissingField(path)),
        Value::String(s) => Ok(s.clone()),
        _ => Err(ValidationError::NotAString(path)),
    }
}

fn required_string(entry: &Value, object: &str, index: usize, field: &str) -> Result<String, ValidationError> {
    let path = format!("{}[{}].{}", object, index, field);
    match entry.get(field) {
        None => Err(ValidationError::MissingField(path)),
        Some(v) => string_field(v, path),
    }
}

fn validate_issue(entry: &Value, index: usize) -> Result<Issue, ValidationError> {
    let title = required_string(entry, "issues", index, "title")?;
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyField(format!("issues[{}].title", index)));
    }

    let package = required_string(entry, "issues", index, "package")?;
    if package.trim().is_empty() {
        return Err(ValidationError::EmptyField(format!("issues[{}].package", index)));
    }

    let severity_raw = required_string(entry, "issues", index, "severity")?;
    let severity = Severity::parse(&severity_raw)
        .ok_or_else(|| ValidationError::UnknownSeverity(severity_raw.clone()))?;

    let category_raw = required_string(entry, "issues", index, "category")?;
    let category = IssueCategory::parse(&category_raw)
        .ok_or_else(|| ValidationError::UnknownCategory(category_raw.clone()))?;

    let description = required_string(entry, "issues", index, "description")?;

    Ok(Issue {
        title,
        package,
        severity,
        category,
        description,
    })
}

fn validate_diff_entry(entry: &Value, index: usize) -> Result<DependencyChange, ValidationError> {
    let package = required_string(entry, "dependencyDiff", index, "package")?;
    if package.trim().is_empty() {
        return Err(ValidationError::EmptyField(format!(
            "dependencyDiff[{}].package",
            index
        )));
    }

    let before = required_string(entry, "dependencyDiff", index, "before")?;
    let after = required_string(entry, "dependencyDiff", index, "after")?;

    Ok(DependencyChange {
        package,
        before,
        after,
    })
}
