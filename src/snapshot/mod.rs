//! Corrected-manifest snapshot generation (`.zfix` documents)

pub mod generator;
pub mod prompt;
pub mod types;

pub use generator::{SnapshotGenerator, SNAPSHOT_FILENAME};
pub use prompt::{build_snapshot_prompt, OutputFormat, SNAPSHOT_SYSTEM_PROMPT};
pub use types::{
    SnapshotRequest, SnapshotResponse, ZfixDocument, DEFAULT_CHANGE_REASON,
};
