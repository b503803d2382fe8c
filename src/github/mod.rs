//! GitHub access: repository references and the HTTP client
//!
//! Everything the pipeline knows about GitHub lives here: parsing
//! user-supplied URLs into `(owner, repo)` pairs, probing for a `main`
//! branch, fetching raw file contents, and looking up the latest commit SHA
//! for cache keying.

pub mod client;
pub mod repo;

pub use client::GithubClient;
pub use repo::{RepoRef, RepoRefError};
