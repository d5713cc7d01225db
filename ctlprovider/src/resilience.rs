//! Retry/backoff policy and gateway operation hook contracts.
//!
//! The gateway never retries on its own; callers consult [`RetryPolicy`]
//! between attempts.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use ctlprovider::{ProviderError, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.backoff, Duration::from_secs(1));
//! assert!(policy.should_retry(1, &ProviderError::from_status(429, "slow down")));
//! assert!(!policy.should_retry(1, &ProviderError::authentication("bad token")));
//! ```

use std::time::Duration;

use crate::{FailureClass, ProviderError, ProviderId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Ceiling on consecutive failed attempts within one turn.
    pub max_attempts: u32,
    /// Constant wait before every retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(8, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn fixed(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// `attempt` is the number of failures seen so far, starting at 1.
    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        error.failure_class() != FailureClass::Fatal && attempt < self.max_attempts
    }
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_request_start(&self, _provider: ProviderId, _operation: &str) {}

    fn on_success(&self, _provider: ProviderId, _operation: &str, _elapsed: Duration) {}

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_one_second_fixed_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy, RetryPolicy::fixed(8, Duration::from_secs(1)));
        assert_eq!(RetryPolicy::new(3).backoff, Duration::from_secs(1));
    }

    #[test]
    fn retry_policy_respects_attempt_ceiling_and_fatal_errors() {
        let policy = RetryPolicy::new(3);
        let throttled = ProviderError::from_status(429, "throttled");
        let rejected = ProviderError::from_status(400, "too long");
        let unconfigured = ProviderError::configuration("No model configured");

        assert!(policy.should_retry(1, &throttled));
        assert!(policy.should_retry(2, &rejected));
        assert!(!policy.should_retry(3, &throttled));
        assert!(!policy.should_retry(1, &unconfigured));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.should_retry(1, &ProviderError::timeout("slow")));
    }
}
