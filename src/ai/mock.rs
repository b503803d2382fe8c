//! Scripted backend for tests
//!
//! Queues canned replies and records every call so tests can assert how
//! many times the pipeline actually reached the model (cache hits must
//! reach it zero times).

use crate::ai::backend::{BackendError, ChatRequest, CompletionBackend};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct MockBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queues a successful reply.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(content.into()));
    }

    /// Queues an error reply.
    pub fn push_error(&self, error: BackendError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Number of completion calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Replies still queued and unconsumed.
    pub fn remaining_replies(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, _request: ChatRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::InvalidResponse {
                    message: "MockBackend has no queued replies".to_string(),
                    raw_response: None,
                })
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_consumed_in_order() {
        let backend = MockBackend::new();
        backend.push_reply("first");
        backend.push_reply("second");

        let request = ChatRequest::new("sys", "user");
        assert_eq!(backend.complete(request.clone()).await.unwrap(), "first");
        assert_eq!(backend.complete(request).await.unwrap(), "second");
        assert_eq!(backend.call_count(), 2);
        assert_eq!(backend.remaining_replies(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_queue_errors() {
        let backend = MockBackend::new();
        let result = backend.complete(ChatRequest::new("sys", "user")).await;
        assert!(matches!(
            result,
            Err(BackendError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_queued_errors_surface() {
        let backend = MockBackend::new();
        backend.push_error(BackendError::RateLimitError { retry_after: None });

        let result = backend.complete(ChatRequest::new("sys", "user")).await;
        assert!(matches!(result, Err(BackendError::RateLimitError { .. })));
        assert_eq!(backend.call_count(), 1);
    }
}
