//! GitHub repository references
//!
//! A [`RepoRef`] is the `(owner, repo)` pair extracted from a user-supplied
//! GitHub URL. Parsing is deliberately permissive about everything around
//! the `github.com/{owner}/{repo}` core: schemes, `www.` prefixes, and
//! trailing path segments are ignored, and a trailing `.git` is stripped.

use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Errors from repository URL parsing
#[derive(Debug, Error, PartialEq)]
pub enum RepoRefError {
    /// The input does not contain a recognizable github.com/{owner}/{repo}
    #[error("Invalid GitHub URL format")]
    InvalidUrl,
}

/// An owner/repo pair on GitHub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name, without any `.git` suffix
    pub repo: String,
}

impl RepoRef {
    /// Parses a repository reference out of a GitHub URL
    ///
    /// # Example
    ///
    /// ```
    /// use pindrift::github::RepoRef;
    ///
    /// let repo = RepoRef::parse("https://github.com/acme/demo.git").unwrap();
    /// assert_eq!(repo.owner, "acme");
    /// assert_eq!(repo.repo, "demo");
    /// ```
    pub fn parse(url: &str) -> Result<Self, RepoRefError> {
        let re = Regex::new(r"github\.com/([^/]+)/([^/]+)").expect("valid repo URL regex");

        let captures = re.captures(url).ok_or(RepoRefError::InvalidUrl)?;

        let owner = captures[1].to_string();
        let repo = captures[2].trim_end_matches(".git").to_string();

        if owner.is_empty() || repo.is_empty() {
            return Err(RepoRefError::InvalidUrl);
        }

        Ok(Self { owner, repo })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
