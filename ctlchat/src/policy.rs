//! Turn policy: retry ceiling, backoff, and generation options.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use ctlchat::ChatPolicy;
//!
//! let policy = ChatPolicy::default();
//! assert_eq!(policy.retry.max_attempts, 8);
//! assert_eq!(policy.retry.backoff, Duration::from_secs(1));
//! assert_eq!(policy.options.temperature, Some(1.0));
//!
//! let quick = ChatPolicy::default().with_backoff(Duration::from_millis(10));
//! assert_eq!(quick.retry.backoff, Duration::from_millis(10));
//! ```

use std::time::Duration;

use ctlcommon::GenerationOptions;
use ctlprovider::RetryPolicy;

pub const DEFAULT_TEMPERATURE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatPolicy {
    /// Applies to consecutive failed generation attempts within one turn.
    pub retry: RetryPolicy,
    pub options: GenerationOptions,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            options: GenerationOptions::default().with_temperature(DEFAULT_TEMPERATURE),
        }
    }
}

impl ChatPolicy {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Keeps the retry ceiling and switches to a constant delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry = RetryPolicy::fixed(self.retry.max_attempts, backoff);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}
