//! pindrift - AI-assisted reproducibility scanner for Python dependency manifests
//!
//! This library discovers dependency manifests in a GitHub repository (or a
//! local checkout), forwards their contents to a chat-completion LLM with a
//! conflict-heuristics prompt, validates the model's JSON reply, and derives
//! a 0-100 reproducibility score. Results can be cached, shared via public
//! tokens, and turned into corrected-manifest snapshots.
//!
//! # Core Concepts
//!
//! - **Manifest location**: probing a fixed candidate set (requirements.txt,
//!   pyproject.toml, lockfiles, ...) against the raw file host, concurrently,
//!   tolerating absences
//! - **Version sniffing**: first-match regex probes over pyproject and
//!   auxiliary files (.python-version, runtime.txt, CI workflows)
//! - **Delegated analysis**: conflict intelligence comes from an external
//!   model; pindrift owns prompt construction, reply validation, and scoring
//! - **Scoring**: a deterministic 50-base additive formula over pinning
//!   ratios and issue counts, clamped to 100
//!
//! # Example Usage
//!
//! ```ignore
//! use pindrift::analysis::score::reproducibility_score;
//! use pindrift::pipeline::Scanner;
//!
//! async fn scan(scanner: &Scanner) -> anyhow::Result<()> {
//!     let report = scanner.scan_repo("https://github.com/acme/demo").await?;
//!     println!("score: {}", report.data.reproducibility_score);
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`github`]: repository references and the GitHub HTTP client
//! - [`manifest`]: candidate catalogue, probe policies, locator, sniffer
//! - [`analysis`]: domain types, prompt builder, reply interpreter, score
//! - [`ai`]: chat-completion backend trait and gateway client
//! - [`osv`]: best-effort OSV.dev vulnerability lookup
//! - [`store`]: cache/share/rate-window storage (memory and SurrealDB)
//! - [`pipeline`]: scan orchestration
//! - [`snapshot`]: corrected-manifest snapshot generation
//! - [`server`]: axum HTTP API
//! - [`cli`]: command definitions, API client, terminal output

pub mod ai;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod github;
pub mod manifest;
pub mod osv;
pub mod pipeline;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod util;

// Re-export key types for convenient access
pub use ai::backend::{BackendError, ChatRequest, CompletionBackend};
pub use ai::gateway::GatewayClient;
pub use analysis::types::{
    AnalysisData, AnalysisDocument, DependencyChange, Issue, IssueCategory, Severity,
    Vulnerability,
};
pub use config::{Config, ConfigError};
pub use manifest::{DetectedVersion, ManifestFile, ManifestKind};
pub use pipeline::{ScanError, Scanner};
pub use server::AppState;
pub use snapshot::{SnapshotGenerator, SnapshotRequest, SnapshotResponse};
pub use store::{AnalysisStore, CacheKey, StoreError};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
