//! Manifest discovery and Python version sniffing
//!
//! This module owns the candidate catalogue (which filenames count as
//! dependency manifests), the probe policies that drive traversal, the
//! locator that fetches candidates from GitHub, and the version sniffer.

pub mod locator;
pub mod probe;
pub mod types;
pub mod version;

pub use locator::{Discovery, LocateError, ManifestLocator};
pub use probe::ProbePolicy;
pub use types::{DetectedVersion, ManifestFile, ManifestKind, CANDIDATES};
pub use version::VersionSniffer;
