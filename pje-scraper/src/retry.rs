//! Bounded retry for transient failures.

use std::future::Future;

use tracing::{instrument, warn};

use crate::errors::AutomationError;

/// Retry policy for page interactions. Only errors the classifier accepts
/// are retried; everything else propagates on first occurrence.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    classify: fn(&AutomationError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            classify: AutomationError::is_retriable,
        }
    }
}

impl RetryPolicy {
    /// Attempts are clamped to at least one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_classifier(mut self, classify: fn(&AutomationError) -> bool) -> Self {
        self.classify = classify;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` up to `max_attempts` times. Exhaustion wraps the last error
    /// in [`AutomationError::RetryExhausted`] so callers see both the failing
    /// operation and the underlying cause.
    #[instrument(level = "debug", skip(self, op))]
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, AutomationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AutomationError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if (self.classify)(&err) && attempt < self.max_attempts => {
                    warn!(operation, attempt, %err, "retriable failure, retrying");
                }
                Err(err) if (self.classify)(&err) => {
                    return Err(AutomationError::RetryExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
