//! AI backend integrations
//!
//! This module provides the completion abstraction and the HTTP client
//! that power dependency analysis and snapshot generation.

pub mod backend;
pub mod gateway;
pub mod mock;

// Re-export commonly used types
pub use backend::{BackendError, ChatRequest, CompletionBackend, DEFAULT_TEMPERATURE};
pub use gateway::GatewayClient;
pub use mock::MockBackend;
