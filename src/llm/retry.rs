use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::provider::CompletionBackend;
use super::types::CompletionRequest;
use crate::core::errors::ApiError;

/// Retry schedule for completion calls. The default matches the protocol's
/// contract: three attempts, back to back.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

/// Completion backend wrapped with a retry policy. Exhausting the budget
/// yields `ApiError::CompletionUnavailable`, never a stand-in answer, so
/// callers can tell a failed backend from a generated reply.
#[derive(Clone)]
pub struct CompletionService {
    backend: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
}

impl CompletionService {
    pub fn new(backend: Arc<dyn CompletionBackend>, policy: RetryPolicy) -> Self {
        CompletionService { backend, policy }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ApiError> {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.backend.complete(request).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    tracing::warn!(
                        "{} completion attempt {}/{} failed: {}",
                        self.backend.name(),
                        attempt,
                        attempts,
                        err
                    );
                    if attempt < attempts && !self.policy.delay.is_zero() {
                        sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(ApiError::CompletionUnavailable { attempts })
    }
}
