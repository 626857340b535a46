//! Bounded retry with backoff for transient model-call failures.
//!
//! Optional decorator around any [`ModelCall`]. Retries rate limits and
//! request failures; timeouts and malformed responses are not retried (the
//! analyzer handles those by degrading to rule-based-only scoring). Retry is
//! a transport policy, not part of the scoring contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::LlmError;
use crate::llm::provider::ModelCall;

/// Retry policy for a [`RetryingModel`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each subsequent retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// A [`ModelCall`] decorator that retries transient failures.
pub struct RetryingModel {
    inner: Arc<dyn ModelCall>,
    policy: RetryPolicy,
}

impl RetryingModel {
    pub fn new(inner: Arc<dyn ModelCall>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ModelCall for RetryingModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.inner.complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    // A rate-limit hint from the provider overrides our backoff.
                    let wait = match &e {
                        LlmError::RateLimited {
                            retry_after: Some(after),
                            ..
                        } => *after,
                        _ => backoff,
                    };
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Transient model-call failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with a transient error N times, then succeeds.
    struct FlakyModel {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ModelCall for FlakyModel {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "connection reset".into(),
                })
            } else {
                Ok("{\"score\": 0.5}".into())
            }
        }
    }

    /// Always fails with a non-transient error.
    struct BadJsonModel {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ModelCall for BadJsonModel {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::InvalidResponse {
                provider: "mock".into(),
                reason: "empty completion".into(),
            })
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let inner = Arc::new(FlakyModel {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let model = RetryingModel::new(inner.clone(), fast_policy(3));
        let result = model.complete("prompt").await;
        assert!(result.is_ok());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let inner = Arc::new(FlakyModel {
            failures: 10,
            calls: AtomicU32::new(0),
        });
        let model = RetryingModel::new(inner.clone(), fast_policy(3));
        let result = model.complete("prompt").await;
        assert!(result.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let inner = Arc::new(BadJsonModel {
            calls: AtomicU32::new(0),
        });
        let model = RetryingModel::new(inner.clone(), fast_policy(5));
        let result = model.complete("prompt").await;
        assert!(matches!(result, Err(LlmError::InvalidResponse { .. })));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
