//! Manifest candidate catalogue and discovery types
//!
//! The candidate set is fixed: six filenames, each with a stable type-tag
//! (used in machine-readable output) and a human-readable format label. The
//! probe order below is also the priority order for "primary format" and
//! raw-requirements selection.

use serde::{Deserialize, Serialize};

/// The kinds of Python dependency manifests pindrift understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestKind {
    Pip,
    Poetry,
    PoetryLock,
    Pipenv,
    PipenvLock,
    Setuptools,
}

/// Candidate filenames in probe (and priority) order
pub const CANDIDATES: [ManifestKind; 6] = [
    ManifestKind::Pip,
    ManifestKind::Poetry,
    ManifestKind::PoetryLock,
    ManifestKind::Pipenv,
    ManifestKind::PipenvLock,
    ManifestKind::Setuptools,
];

impl ManifestKind {
    /// The exact filename probed for this kind
    pub fn filename(&self) -> &'static str {
        match self {
            ManifestKind::Pip => "requirements.txt",
            ManifestKind::Poetry => "pyproject.toml",
            ManifestKind::PoetryLock => "poetry.lock",
            ManifestKind::Pipenv => "Pipfile",
            ManifestKind::PipenvLock => "Pipfile.lock",
            ManifestKind::Setuptools => "setup.py",
        }
    }

    /// Stable type-tag for machine-readable output
    pub fn tag(&self) -> &'static str {
        match self {
            ManifestKind::Pip => "pip",
            ManifestKind::Poetry => "poetry",
            ManifestKind::PoetryLock => "poetry-lock",
            ManifestKind::Pipenv => "pipenv",
            ManifestKind::PipenvLock => "pipenv-lock",
            ManifestKind::Setuptools => "setuptools",
        }
    }

    /// Human-readable format label shown in results
    pub fn label(&self) -> &'static str {
        match self {
            ManifestKind::Pip => "Requirements.txt",
            ManifestKind::Poetry => "Poetry (pyproject.toml)",
            ManifestKind::PoetryLock => "Poetry Lock",
            ManifestKind::Pipenv => "Pipenv",
            ManifestKind::PipenvLock => "Pipenv Lock",
            ManifestKind::Setuptools => "Setup.py",
        }
    }

    /// Classifies a bare filename against the candidate table
    pub fn from_filename(name: &str) -> Option<Self> {
        CANDIDATES.into_iter().find(|kind| kind.filename() == name)
    }
}

/// One discovered manifest: its kind plus the fetched text
///
/// Owned by a single request; never cached or mutated after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub kind: ManifestKind,
    pub content: String,
}

impl ManifestFile {
    pub fn new(kind: ManifestKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    /// The filename this manifest was discovered under
    pub fn name(&self) -> &'static str {
        self.kind.filename()
    }
}

/// Sentinel version string when nothing matched
pub const UNKNOWN_VERSION: &str = "unknown";

/// Sentinel source string when nothing matched
pub const NOT_DETECTED: &str = "not detected";

/// The sniffed Python version and where it came from
///
/// "unknown"/"not detected" is a valid value, not an error: downstream
/// consumers switch to generic guidance when no version is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedVersion {
    pub version: String,
    pub source: String,
}

impl DetectedVersion {
    pub fn new(version: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            source: source.into(),
        }
    }

    /// The "nothing found" sentinel
    pub fn not_detected() -> Self {
        Self {
            version: UNKNOWN_VERSION.to_string(),
            source: NOT_DETECTED.to_string(),
        }
    }

    /// Whether a real version token was found
    pub fn is_detected(&self) -> bool {
        self.version != UNKNOWN_VERSION
    }
}
