//! Opt-in retry with exponential backoff around a completion client.
//!
//! With zero retries the wrapper forwards a single attempt and returns its
//! error unchanged.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use insight_core::AppResult;
use std::sync::Arc;
use std::time::Duration;

/// Initial backoff duration in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 250;

/// Completion client that retries retryable failures.
pub struct RetryingClient {
    inner: Arc<dyn LlmClient>,
    retries: u32,
    initial_backoff: Duration,
}

impl RetryingClient {
    /// Wrap `inner`, allowing up to `retries` extra attempts.
    pub fn new(inner: Arc<dyn LlmClient>, retries: u32) -> Self {
        Self {
            inner,
            retries,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first backoff delay (doubles on every attempt).
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }
}

#[async_trait::async_trait]
impl LlmClient for RetryingClient {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let mut attempt = 0u32;

        loop {
            match self.inner.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retries && e.is_retryable() => {
                    attempt += 1;
                    let backoff = self.initial_backoff * 2_u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        "Completion failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt,
                        self.retries + 1,
                        backoff.as_millis(),
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Convenience for callers that want to log the policy in use.
pub fn describe_policy(retries: u32) -> String {
    match retries {
        0 => "no retry".to_string(),
        n => format!("up to {} retr{}", n, if n == 1 { "y" } else { "ies" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmUsage;
    use insight_core::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then answers.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        error: fn() -> AppError,
    }

    #[async_trait::async_trait]
    impl LlmClient for Flaky {
        fn provider_name(&self) -> &str {
            "flaky"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err((self.error)());
            }
            Ok(LlmResponse {
                content: "answer".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    fn flaky(failures: u32, error: fn() -> AppError) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures,
            calls: AtomicU32::new(0),
            error,
        })
    }

    fn timeout_error() -> AppError {
        AppError::Completion("timed out".to_string())
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let inner = flaky(1, timeout_error);
        let client = RetryingClient::new(inner.clone(), 0);

        let result = client.complete(&LlmRequest::new("p", "llama3")).await;
        assert!(result.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = flaky(2, timeout_error);
        let client =
            RetryingClient::new(inner.clone(), 3).with_initial_backoff(Duration::from_millis(1));

        let response = client.complete(&LlmRequest::new("p", "llama3")).await.unwrap();
        assert_eq!(response.content, "answer");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let inner = flaky(10, timeout_error);
        let client =
            RetryingClient::new(inner.clone(), 2).with_initial_backoff(Duration::from_millis(1));

        let err = client.complete(&LlmRequest::new("p", "llama3")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_pass_through() {
        let inner = flaky(1, || AppError::Prompt("bad template".to_string()));
        let client =
            RetryingClient::new(inner.clone(), 3).with_initial_backoff(Duration::from_millis(1));

        assert!(client.complete(&LlmRequest::new("p", "llama3")).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_describe_policy() {
        assert_eq!(describe_policy(0), "no retry");
        assert_eq!(describe_policy(1), "up to 1 retry");
        assert_eq!(describe_policy(3), "up to 3 retries");
    }
}
