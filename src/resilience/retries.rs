//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a request is retryable (cacheable methods only)
//! - Hold the fixed delay before the single retry
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent)
//! - Exactly one retry, after a fixed delay; no exponential growth
//! - Only transport failures are retried; any HTTP status is a final answer

use std::time::Duration;

use axum::http::Method;

/// Attempts made for a retryable request: the first try plus one retry.
pub const RETRYABLE_ATTEMPTS: u32 = 2;

/// Retry behaviour of the upstream forwarding path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait before the retry.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Total attempts allowed for `method`.
    pub fn max_attempts(&self, method: &Method) -> u32 {
        if is_retryable(method) {
            RETRYABLE_ATTEMPTS
        } else {
            1
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// GET and HEAD are safe to cache and to send twice.
pub fn is_retryable(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_safe_methods_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(&Method::GET), 2);
        assert_eq!(policy.max_attempts(&Method::HEAD), 2);
        assert_eq!(policy.max_attempts(&Method::POST), 1);
        assert_eq!(policy.max_attempts(&Method::PUT), 1);
        assert_eq!(policy.max_attempts(&Method::DELETE), 1);
        assert_eq!(policy.max_attempts(&Method::OPTIONS), 1);
    }

    #[test]
    fn default_delay_is_one_second() {
        assert_eq!(RetryPolicy::default().delay(), Duration::from_secs(1));
    }
}
