pub mod client;
pub mod commands;
pub mod handlers;
pub mod output;

pub use client::{ApiClient, ClientError};
pub use commands::{CliArgs, Commands, ScanArgs, ServeArgs, SnapshotArgs};
pub use handlers::{handle_scan, handle_serve, handle_snapshot};
pub use output::Renderer;
