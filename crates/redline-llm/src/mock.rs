//! Deterministic gateway for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use redline_core::{CompletionRequest, LlmGateway, RedlineError, Result};

/// Gateway that returns canned replies without any network calls.
///
/// Queued replies are consumed first, then the default reply is returned
/// for every call. A failing mock returns a gateway error instead. Every
/// request is recorded.
#[derive(Debug, Clone)]
pub struct MockGateway {
    default_response: std::result::Result<String, String>,
    queued: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockGateway {
    /// Mock that answers every request with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: Ok(response.into()),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock whose every call fails with a gateway error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            default_response: Err(message.into()),
            ..Self::new("")
        }
    }

    /// Queue a reply to be returned before the default one.
    pub fn push_response(&self, response: impl Into<String>) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response.into());
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmGateway for MockGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(response) = queued {
            return Ok(response);
        }

        self.default_response
            .clone()
            .map_err(RedlineError::gateway)
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_response() {
        let gateway = MockGateway::new("Fixed response");
        let request = CompletionRequest::new("sys", "any prompt");

        assert_eq!(gateway.complete(&request).await.unwrap(), "Fixed response");
        assert_eq!(gateway.complete(&request).await.unwrap(), "Fixed response");
        assert_eq!(gateway.call_count(), 2);
        assert_eq!(
            gateway.last_request().unwrap().last_user_message(),
            Some("any prompt")
        );
    }

    #[tokio::test]
    async fn test_queued_responses_first() {
        let gateway = MockGateway::new("default");
        gateway.push_response("first");
        gateway.push_response("second");
        let request = CompletionRequest::new("sys", "user");

        assert_eq!(gateway.complete(&request).await.unwrap(), "first");
        assert_eq!(gateway.complete(&request).await.unwrap(), "second");
        assert_eq!(gateway.complete(&request).await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_failing_gateway() {
        let gateway = MockGateway::failing("rate limited");
        let err = gateway
            .complete(&CompletionRequest::new("sys", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, RedlineError::Gateway { .. }));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let gateway = MockGateway::new("ok");
        let clone = gateway.clone();
        clone
            .complete(&CompletionRequest::new("sys", "user"))
            .await
            .unwrap();
        assert_eq!(gateway.call_count(), 1);
    }
}
