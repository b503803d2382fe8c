pub mod client;

pub use client::{pinned_packages, OsvClient, OsvError, PackageQuery};
