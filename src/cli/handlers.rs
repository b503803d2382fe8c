//! Command handlers for the pindrift binary
//!
//! Each handler returns a process exit code. The scan and snapshot commands
//! are thin clients of a pindrift server; serve wires the full pipeline up
//! and runs it in-process.

use crate::ai::{CompletionBackend, GatewayClient};
use crate::analysis::types::AnalysisDocument;
use crate::cli::client::{ApiClient, ClientError};
use crate::cli::commands::{ScanArgs, ServeArgs, SnapshotArgs};
use crate::cli::output::Renderer;
use crate::config::Config;
use crate::github::GithubClient;
use crate::manifest::{version, CANDIDATES};
use crate::osv::OsvClient;
use crate::pipeline::Scanner;
use crate::server::{self, AppState};
use crate::snapshot::{SnapshotGenerator, SnapshotRequest, SNAPSHOT_FILENAME};
use crate::store::{AnalysisStore, MemoryStore, SurrealStore};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Handles the scan command
pub async fn handle_scan(args: &ScanArgs, quiet: bool) -> i32 {
    let config = Config::from_env();
    let client = ApiClient::from_config(&config);
    let renderer = Renderer::stdout();

    if is_remote(&args.target) {
        scan_remote(&client, &renderer, args, quiet).await
    } else {
        scan_local(&client, &renderer, args, quiet).await
    }
}

/// Handles the snapshot command: scan, then ask for corrected dependencies
pub async fn handle_snapshot(args: &SnapshotArgs, quiet: bool) -> i32 {
    let config = Config::from_env();
    let client = ApiClient::from_config(&config);
    let renderer = Renderer::stdout();

    if !is_remote(&args.url) {
        eprintln!(
            "{}",
            renderer.render_error("Please provide a valid GitHub repository URL")
        );
        return 1;
    }

    let spinner = scan_spinner(quiet);
    spinner.set_message("Fetching repository data...");

    let envelope = match client.analyze(&args.url).await {
        Ok(envelope) => envelope,
        Err(e) => return request_failure(&spinner, &renderer, &e),
    };

    let document = match extract_document(&envelope) {
        Ok(document) => document,
        Err(message) => {
            spinner.finish_and_clear();
            eprintln!("{}", renderer.render_error(&message));
            return 1;
        }
    };

    spinner.set_message("Generating corrected dependencies...");
    let request = SnapshotRequest::from_document(&document, &args.url);
    let response = match client.generate_snapshot(&request).await {
        Ok(response) => response,
        Err(e) => return request_failure(&spinner, &renderer, &e),
    };
    spinner.finish_and_clear();

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(SNAPSHOT_FILENAME));
    let body = match serde_json::to_string_pretty(&response.zfix_data) {
        Ok(body) => body,
        Err(e) => {
            eprintln!(
                "{}",
                renderer.render_error(&format!("Failed to encode snapshot: {}", e))
            );
            return 1;
        }
    };
    if let Err(e) = std::fs::write(&path, body) {
        eprintln!(
            "{}",
            renderer.render_error(&format!("Failed to write {}: {}", path.display(), e))
        );
        return 1;
    }

    print!("{}", renderer.render_snapshot_saved(&path, &response.filename));
    0
}

/// Handles the serve command: wire the pipeline up and run the HTTP API
pub async fn handle_serve(args: &ServeArgs) -> i32 {
    let mut config = Config::from_env();
    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return 1;
    }

    let store: Arc<dyn AnalysisStore> = if args.memory {
        info!("Using volatile in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let endpoint = config.db_endpoint();
        match SurrealStore::connect(&endpoint).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to open store at {}: {}", endpoint, e);
                return 1;
            }
        }
    };

    let backend: Arc<dyn CompletionBackend> = Arc::new(GatewayClient::from_config(&config));
    let github = GithubClient::new(config.github_api_url.clone(), config.github_raw_url.clone());

    let mut scanner =
        Scanner::new(github, backend.clone()).with_store(store.clone(), config.cache_ttl_hours);
    if config.osv_enabled {
        scanner = scanner.with_osv(OsvClient::new(config.osv_url.clone()));
    }

    let snapshots = SnapshotGenerator::new(backend);
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, scanner, snapshots, store);

    match server::serve(state, &bind_addr).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Server error: {}", e);
            1
        }
    }
}

async fn scan_remote(client: &ApiClient, renderer: &Renderer, args: &ScanArgs, quiet: bool) -> i32 {
    let spinner = scan_spinner(quiet);
    spinner.set_message("Fetching repository data...");

    let envelope = match client.analyze(&args.target).await {
        Ok(envelope) => envelope,
        Err(e) => return request_failure(&spinner, renderer, &e),
    };
    spinner.finish_and_clear();

    render_envelope(renderer, &args.target, envelope, args.json)
}

async fn scan_local(client: &ApiClient, renderer: &Renderer, args: &ScanArgs, quiet: bool) -> i32 {
    let root = Path::new(&args.target);
    if !root.is_dir() {
        eprintln!(
            "{}",
            renderer.render_error(
                "Please provide a GitHub repository URL or an existing local directory"
            )
        );
        return 1;
    }

    let files = read_local_manifests(root);
    if files.is_empty() {
        eprintln!(
            "{}",
            renderer.render_error(
                "No Python dependency files found (requirements.txt, pyproject.toml, Pipfile, or setup.py)"
            )
        );
        return 1;
    }

    let python_version = sniff_local_version(root, &files);
    debug!(
        "Scanning {} local manifests, python={:?}",
        files.len(),
        python_version
    );

    let spinner = scan_spinner(quiet);
    spinner.set_message("Analyzing dependencies...");

    let envelope = match client.analyze_local(&files, python_version.as_deref()).await {
        Ok(envelope) => envelope,
        Err(e) => return request_failure(&spinner, renderer, &e),
    };
    spinner.finish_and_clear();

    render_envelope(renderer, &args.target, envelope, args.json)
}

/// Remote targets are GitHub URLs; everything else is treated as a path
fn is_remote(target: &str) -> bool {
    target.contains("github.com/")
}

/// Reads the candidate manifests present in a local project directory
fn read_local_manifests(root: &Path) -> Vec<(String, String)> {
    let mut files = Vec::new();
    for kind in CANDIDATES {
        let path = root.join(kind.filename());
        if let Ok(content) = std::fs::read_to_string(&path) {
            debug!("Read local manifest {}", path.display());
            files.push((kind.filename().to_string(), content));
        }
    }
    files
}

/// Sniffs the Python version from local files, pyproject first
///
/// Mirrors the remote precedence: a `python = "..."` constraint in
/// pyproject.toml wins; otherwise the auxiliary probe files are tried in
/// order with early exit.
fn sniff_local_version(root: &Path, files: &[(String, String)]) -> Option<String> {
    if let Some((_, content)) = files.iter().find(|(name, _)| name == "pyproject.toml") {
        if let Some(found) = version::from_pyproject(content) {
            return Some(found);
        }
    }

    for probe in version::AUX_PROBES {
        if let Ok(content) = std::fs::read_to_string(root.join(probe.path)) {
            if let Some(found) = version::from_aux_file(probe.path, &content) {
                return Some(found);
            }
        }
    }

    None
}

fn render_envelope(renderer: &Renderer, target: &str, envelope: Value, json: bool) -> i32 {
    if json {
        let text =
            serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string());
        println!("{}", text);
        return 0;
    }

    match extract_document(&envelope) {
        Ok(document) => {
            print!("{}", renderer.render_analysis(target, &document));
            0
        }
        Err(message) => {
            eprintln!("{}", renderer.render_error(&message));
            1
        }
    }
}

fn extract_document(envelope: &Value) -> Result<AnalysisDocument, String> {
    serde_json::from_value(envelope["data"].clone())
        .map_err(|e| format!("Unexpected response from server: {}", e))
}

fn request_failure(spinner: &ProgressBar, renderer: &Renderer, error: &ClientError) -> i32 {
    spinner.finish_and_clear();
    eprintln!("{}", renderer.render_error(&error.to_string()));
    1
}

/// A spinner on stderr, hidden under quiet mode or when piped
fn scan_spinner(quiet: bool) -> ProgressBar {
    if quiet || !atty::is(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid spinner template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Connecting to pindrift API...");
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_remote_classification() {
        assert!(is_remote("https://github.com/pallets/flask"));
        assert!(is_remote("github.com/pallets/flask"));
        assert!(!is_remote("./my-project"));
        assert!(!is_remote("/tmp/checkout"));
    }

    #[test]
    fn test_read_local_manifests_in_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Pipfile"), "[packages]\n").unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "flask==2.0.0\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "docs\n").unwrap();

        let files = read_local_manifests(dir.path());

        let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["requirements.txt", "Pipfile"]);
        assert_eq!(files[0].1, "flask==2.0.0\n");
    }

    #[test]
    fn test_read_local_manifests_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_local_manifests(dir.path()).is_empty());
    }

    #[test]
    fn test_sniff_local_version_prefers_pyproject() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".python-version"), "3.9.0\n").unwrap();

        let files = vec![(
            "pyproject.toml".to_string(),
            "[tool.poetry.dependencies]\npython = \"^3.11\"\n".to_string(),
        )];

        assert_eq!(
            sniff_local_version(dir.path(), &files),
            Some("^3.11".to_string())
        );
    }

    #[test]
    fn test_sniff_local_version_from_aux_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".python-version"), "3.12.1\n").unwrap();

        assert_eq!(
            sniff_local_version(dir.path(), &[]),
            Some("3.12.1".to_string())
        );
    }

    #[test]
    fn test_sniff_local_version_none_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(sniff_local_version(dir.path(), &[]), None);
    }

    #[test]
    fn test_extract_document_round_trip() {
        let envelope = json!({
            "success": true,
            "data": {
                "data": {
                    "issues": [],
                    "suggestions": [],
                    "dependencyDiff": [],
                    "vulnerabilities": [],
                    "reproducibilityScore": 80
                },
                "detectedFormats": ["Requirements.txt"],
                "primaryFormat": "Requirements.txt",
                "pythonVersion": "3.11",
                "pythonVersionSource": "pyproject.toml",
                "foundFiles": [],
                "rawRequirements": "flask\n"
            }
        });

        let document = extract_document(&envelope).unwrap();
        assert_eq!(document.data.reproducibility_score, 80);
        assert_eq!(document.python_version, "3.11");
    }

    #[test]
    fn test_extract_document_rejects_missing_data() {
        let err = extract_document(&json!({ "success": true })).unwrap_err();
        assert!(err.contains("Unexpected response from server"));
    }
}
