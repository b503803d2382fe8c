//! End-to-end scan pipeline tests
//!
//! These run the full pipeline with wiremock standing in for the GitHub
//! API and raw-content hosts and `MockBackend` standing in for the AI
//! gateway: branch resolution, manifest discovery, version sniffing,
//! reply interpretation, scoring, vulnerability lookup, and the
//! analysis cache.

use std::sync::Arc;

use pindrift::ai::MockBackend;
use pindrift::github::GithubClient;
use pindrift::osv::OsvClient;
use pindrift::pipeline::{ScanError, Scanner};
use pindrift::store::MemoryStore;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO_URL: &str = "https://github.com/pindrift/demo";

/// A valid model reply: one high-severity missing pin, one suggestion,
/// and a two-entry diff with one package already pinned. Scores 95.
const ANALYSIS_REPLY: &str = r#"{"issues":[{"title":"Missing version pin","package":"numpy","severity":"high","category":"missing_pin","description":"numpy has no version specified"}],"suggestions":["Pin numpy"],"dependencyDiff":[{"package":"numpy","before":"unversioned","after":"1.26.2"},{"package":"pandas","before":"1.3.0","after":"1.3.0"}]}"#;

/// Mounts the branch probe for `pindrift/demo` confirming `main`
async fn mount_main_branch(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/pindrift/demo/branches/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "main"})))
        .mount(server)
        .await;
}

/// Mounts one raw file on the given branch; every unmounted candidate
/// gets wiremock's default 404 and counts as absent.
async fn mount_raw_file(server: &MockServer, branch: &str, name: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/pindrift/demo/{}/{}", branch, name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(content))
        .mount(server)
        .await;
}

fn backend_with_reply() -> Arc<MockBackend> {
    let backend = Arc::new(MockBackend::new());
    backend.push_reply(ANALYSIS_REPLY);
    backend
}

#[tokio::test]
async fn test_scan_repo_full_pipeline() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;
    mount_raw_file(&github, "main", "requirements.txt", "numpy\npandas==1.3.0\n").await;
    mount_raw_file(&github, "main", ".python-version", "3.11.4\n").await;

    let backend = backend_with_reply();
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend.clone());

    let document = scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(backend.call_count(), 1);
    assert_eq!(document.detected_formats, vec!["Requirements.txt"]);
    assert_eq!(document.primary_format, "Requirements.txt");
    assert_eq!(document.python_version, "3.11.4");
    assert_eq!(document.python_version_source, ".python-version");
    assert_eq!(document.raw_requirements, "numpy\npandas==1.3.0\n");
    assert_eq!(document.data.reproducibility_score, 95);
    assert_eq!(document.data.issues.len(), 1);
    assert_eq!(document.data.issues[0].package, "numpy");
    assert_eq!(document.data.suggestions, vec!["Pin numpy"]);
    assert_eq!(document.data.dependency_diff.len(), 2);
    // No OSV client configured, so no vulnerability lookup ran.
    assert!(document.data.vulnerabilities.is_empty());
}

#[tokio::test]
async fn test_scan_repo_collects_every_manifest_in_priority_order() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;
    mount_raw_file(&github, "main", "requirements.txt", "numpy\n").await;
    mount_raw_file(
        &github,
        "main",
        "pyproject.toml",
        "[tool.poetry.dependencies]\npython = \"^3.12\"\nnumpy = \"*\"\n",
    )
    .await;
    mount_raw_file(&github, "main", "Pipfile", "[packages]\nnumpy = \"*\"\n").await;

    let backend = backend_with_reply();
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend);

    let document = scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(
        document.detected_formats,
        vec!["Requirements.txt", "Poetry (pyproject.toml)", "Pipenv"]
    );
    assert_eq!(document.primary_format, "Requirements.txt");
    // pyproject wins version sniffing without any auxiliary fetch.
    assert_eq!(document.python_version, "^3.12");
    assert_eq!(document.python_version_source, "pyproject.toml");
    assert_eq!(document.found_files.len(), 3);
    assert_eq!(document.raw_requirements, "numpy\n");
}

#[tokio::test]
async fn test_scan_repo_falls_back_to_master_branch() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/pindrift/demo/branches/main"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&github)
        .await;
    mount_raw_file(&github, "master", "requirements.txt", "numpy\npandas==1.3.0\n").await;

    let backend = backend_with_reply();
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend);

    let document = scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(document.detected_formats, vec!["Requirements.txt"]);
    // No version source exists on master either.
    assert_eq!(document.python_version, "unknown");
    assert_eq!(document.python_version_source, "not detected");
}

#[tokio::test]
async fn test_scan_repo_without_manifests_is_user_error() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;

    let backend = Arc::new(MockBackend::new());
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend.clone());

    let err = scanner.scan_repo(REPO_URL).await.unwrap_err();

    assert!(matches!(err, ScanError::NoManifests(_)));
    assert!(err.is_user_error());
    assert!(err.to_string().contains("No Python dependency files found"));
    // The gateway is never consulted for an empty repository.
    assert_eq!(backend.call_count(), 0);
}

/// Second scan of an unchanged repository must come from the cache:
/// one AI call, one manifest fetch, identical documents.
#[tokio::test]
async fn test_scan_repo_reuses_cached_analysis() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;
    Mock::given(method("GET"))
        .and(path("/repos/pindrift/demo/commits"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sha": "0123456789abcdef0123456789abcdef01234567"}
        ])))
        .expect(2)
        .mount(&github)
        .await;
    Mock::given(method("GET"))
        .and(path("/pindrift/demo/main/requirements.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("numpy\npandas==1.3.0\n"))
        .expect(1)
        .mount(&github)
        .await;

    let backend = backend_with_reply();
    let store = Arc::new(MemoryStore::new());
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend.clone())
        .with_store(store, 24);

    let first = scanner.scan_repo(REPO_URL).await.unwrap();
    let second = scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(backend.call_count(), 1);
    assert_eq!(first, second);
}

/// A new head commit changes the cache key, so the pipeline runs again.
#[tokio::test]
async fn test_scan_repo_reanalyzes_when_head_moves() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;
    mount_raw_file(&github, "main", "requirements.txt", "numpy\npandas==1.3.0\n").await;
    Mock::given(method("GET"))
        .and(path("/repos/pindrift/demo/commits"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sha": "aaaa111122223333aaaa111122223333aaaa1111"}
        ])))
        .up_to_n_times(1)
        .mount(&github)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/pindrift/demo/commits"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sha": "bbbb444455556666bbbb444455556666bbbb4444"}
        ])))
        .mount(&github)
        .await;

    let backend = Arc::new(MockBackend::new());
    backend.push_reply(ANALYSIS_REPLY);
    backend.push_reply(ANALYSIS_REPLY);
    let store = Arc::new(MemoryStore::new());
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend.clone())
        .with_store(store, 24);

    scanner.scan_repo(REPO_URL).await.unwrap();
    scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(backend.call_count(), 2);
}

/// When the commit lookup fails the cache degrades to URL-only keying
/// rather than being skipped.
#[tokio::test]
async fn test_scan_repo_caches_by_url_when_commit_lookup_fails() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;
    mount_raw_file(&github, "main", "requirements.txt", "numpy\npandas==1.3.0\n").await;
    Mock::given(method("GET"))
        .and(path("/repos/pindrift/demo/commits"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&github)
        .await;

    let backend = backend_with_reply();
    let store = Arc::new(MemoryStore::new());
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend.clone())
        .with_store(store, 24);

    scanner.scan_repo(REPO_URL).await.unwrap();
    scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_scan_repo_attaches_osv_vulnerabilities() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;
    mount_raw_file(&github, "main", "requirements.txt", "jinja2==2.4.1\nnumpy\n").await;

    let osv = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/querybatch"))
        .and(body_partial_json(json!({
            "queries": [{
                "package": {"name": "jinja2", "ecosystem": "PyPI"},
                "version": "2.4.1"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"vulns": [{"id": "GHSA-462w-v97r-4m45", "modified": "2024-01-01T00:00:00Z"}]}]
        })))
        .mount(&osv)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/vulns/GHSA-462w-v97r-4m45"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "GHSA-462w-v97r-4m45",
            "summary": "Jinja2 sandbox escape",
            "database_specific": {"severity": "HIGH"},
            "affected": [{
                "ranges": [{
                    "type": "ECOSYSTEM",
                    "events": [{"introduced": "0"}, {"fixed": "2.10.1"}]
                }]
            }]
        })))
        .mount(&osv)
        .await;

    let backend = backend_with_reply();
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend)
        .with_osv(OsvClient::new(osv.uri()));

    let document = scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(document.data.vulnerabilities.len(), 1);
    let vuln = &document.data.vulnerabilities[0];
    assert_eq!(vuln.id, "GHSA-462w-v97r-4m45");
    assert_eq!(vuln.package, "jinja2");
    assert_eq!(vuln.version, "2.4.1");
    assert_eq!(vuln.severity, "HIGH");
    assert_eq!(vuln.fixed_versions, vec!["2.10.1"]);
    assert_eq!(
        vuln.link,
        "https://osv.dev/vulnerability/GHSA-462w-v97r-4m45"
    );
}

/// An unreachable or failing OSV host never fails the scan.
#[tokio::test]
async fn test_scan_repo_survives_osv_outage() {
    let github = MockServer::start().await;
    mount_main_branch(&github).await;
    mount_raw_file(&github, "main", "requirements.txt", "jinja2==2.4.1\n").await;

    let osv = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/querybatch"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&osv)
        .await;

    let backend = backend_with_reply();
    let scanner = Scanner::new(GithubClient::new(github.uri(), github.uri()), backend)
        .with_osv(OsvClient::new(osv.uri()));

    let document = scanner.scan_repo(REPO_URL).await.unwrap();

    assert_eq!(document.data.reproducibility_score, 95);
    assert!(document.data.vulnerabilities.is_empty());
}
