//! Exponential backoff over classified provider failures.

use std::time::Duration;

use crate::model::FailureKind;

/// When and how long to wait before retrying a failed model call.
///
/// The delay after attempt `n` (1-based) is
/// `min(base_delay * multiplier^(n-1), max_delay)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Failure kinds worth retrying. Anything else fails immediately.
    pub retry_on: Vec<FailureKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            retry_on: vec![FailureKind::ResourceExhausted, FailureKind::ServiceUnavailable],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            retry_on: Vec::new(),
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, kind: FailureKind) -> bool {
        self.retry_on.contains(&kind)
    }

    /// Whether another attempt should follow a failure of `kind` on `attempt`.
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> bool {
        self.is_retryable(kind) && attempt < self.max_attempts
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after(5), Duration::from_secs(10));
        assert_eq!(policy.delay_after(30), Duration::from_secs(10));
    }

    #[test]
    fn retries_only_designated_kinds() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(FailureKind::ResourceExhausted));
        assert!(policy.is_retryable(FailureKind::ServiceUnavailable));
        assert!(!policy.is_retryable(FailureKind::Other));
    }

    #[test]
    fn stops_at_max_attempts() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(FailureKind::ResourceExhausted, 1));
        assert!(policy.should_retry(FailureKind::ResourceExhausted, 2));
        assert!(!policy.should_retry(FailureKind::ResourceExhausted, 3));
        assert!(!policy.should_retry(FailureKind::Other, 1));
    }

    #[test]
    fn predicate_is_data_driven() {
        let policy = RetryPolicy {
            retry_on: vec![FailureKind::Other],
            ..RetryPolicy::default()
        };
        assert!(policy.should_retry(FailureKind::Other, 1));
        assert!(!policy.should_retry(FailureKind::ServiceUnavailable, 1));
    }

    #[test]
    fn none_never_retries() {
        let policy = RetryPolicy::none();
        assert!(!policy.should_retry(FailureKind::ResourceExhausted, 1));
    }
}
