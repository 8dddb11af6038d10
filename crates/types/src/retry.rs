//! Retry policy for node scheduling: exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Scheduled on `NodeOptions`; governs the delay before `NodeScheduled`
/// is re-emitted after a retryable `NodeFailed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "crate::duration_millis")]
    pub initial_interval: Duration,
    #[serde(with = "crate::duration_millis")]
    pub max_interval: Duration,
    pub backoff_coefficient: f64,
    /// Jitter factor (0.0-1.0); a value of 0.1 means ±10% randomness.
    pub jitter: f64,
    #[serde(default)]
    pub non_retryable_errors: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

impl RetryPolicy {
    pub fn exponential() -> Self {
        Self {
            max_attempts: 5,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            backoff_coefficient: 2.0,
            jitter: 0.1,
            non_retryable_errors: vec![],
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            backoff_coefficient: 1.0,
            jitter: 0.0,
            non_retryable_errors: vec![],
        }
    }

    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: interval,
            max_interval: interval,
            backoff_coefficient: 1.0,
            jitter: 0.0,
            non_retryable_errors: vec![],
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_non_retryable_error(mut self, error_type: impl Into<String>) -> Self {
        self.non_retryable_errors.push(error_type.into());
        self
    }

    /// Delay before the given attempt (1-based; attempt 1 is the
    /// original, not a retry, so it has no delay).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let retry_num = attempt - 1;
        let base = self.initial_interval.as_secs_f64()
            * self.backoff_coefficient.powi(retry_num as i32 - 1);
        let capped = base.min(self.max_interval.as_secs_f64());

        let jittered = if self.jitter > 0.0 {
            let mut rng = rand::thread_rng();
            let jitter_range = capped * self.jitter;
            let jitter_offset = rng.gen_range(-jitter_range..jitter_range);
            (capped + jitter_offset).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }

    pub fn should_retry(&self, error_code: Option<&str>) -> bool {
        match error_code {
            Some(code) => !self.non_retryable_errors.contains(&code.to_string()),
            None => true,
        }
    }

    pub fn has_attempts_remaining(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }
}

/// Linear backoff used by the frontend's stream-retry path and the
/// control plane's peer-heartbeat retry — both need a simpler shape
/// than the node-retry exponential curve (`baseDelay * 2^(attempt-1)`
/// vs. `attempt * fixed_step`).
pub fn linear_delay(attempt: u32, step: Duration, max: Duration) -> Duration {
    let millis = step.as_millis().saturating_mul(attempt.max(1) as u128);
    let capped = millis.min(max.as_millis());
    Duration::from_millis(capped as u64)
}

/// `baseDelay * 2^(attempt-1)` capped at `max_delay` — the frontend's
/// stream-message retry shape (spec.md §4.3), distinct from
/// [`RetryPolicy::delay_for_attempt`] in that it carries no jitter and
/// no non-retryable-error set: it backs off a transport-level retry
/// loop, not a node's business-logic retry.
pub fn frontend_retry_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let base_secs = base.as_secs_f64() * 2f64.powi(exponent as i32);
    Duration::from_secs_f64(base_secs.min(max.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_defaults() {
        let policy = RetryPolicy::exponential();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_coefficient, 2.0);
    }

    #[test]
    fn delay_for_attempt_without_jitter() {
        let policy = RetryPolicy::exponential().with_jitter(0.0);
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(4));
    }

    #[test]
    fn max_interval_caps_delay() {
        let policy = RetryPolicy::exponential()
            .with_max_interval(Duration::from_secs(5))
            .with_jitter(0.0);
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn non_retryable_errors_are_respected() {
        let policy = RetryPolicy::exponential().with_non_retryable_error("INVALID_INPUT");
        assert!(!policy.should_retry(Some("INVALID_INPUT")));
        assert!(policy.should_retry(Some("TIMEOUT")));
    }

    #[test]
    fn frontend_retry_matches_scenario_2_delays() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        assert_eq!(frontend_retry_delay(1, base, max), Duration::from_secs(1));
        assert_eq!(frontend_retry_delay(2, base, max), Duration::from_secs(2));
    }

    #[test]
    fn linear_delay_is_attempt_times_step_capped() {
        let step = Duration::from_millis(100);
        let max = Duration::from_millis(250);
        assert_eq!(linear_delay(1, step, max), Duration::from_millis(100));
        assert_eq!(linear_delay(2, step, max), Duration::from_millis(200));
        assert_eq!(linear_delay(3, step, max), Duration::from_millis(250));
    }
}
