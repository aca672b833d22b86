//! Bounded exponential backoff for idempotent provider requests.

use std::time::{Duration, SystemTime};

use reqwest_retry::{RetryDecision, RetryPolicy};

/// Exponential backoff retry policy with an overall time budget.
///
/// Only attached to clients that issue idempotent GETs (discovery, key sets). The token
/// endpoint never retries: an authorization code is single-use.
pub struct BackoffPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_elapsed: Duration,
}

impl BackoffPolicy {
    /// Create a new retry policy.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Maximum number of retry attempts
    /// * `max_elapsed` - Give up once this much time has passed since the first attempt
    pub fn new(max_retries: u32, max_elapsed: Duration) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            max_elapsed,
        }
    }

    /// Override the delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn exponential_delay(&self, n_attempts: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(n_attempts as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }

        let delay = self.exponential_delay(n_past_retries);
        let elapsed = request_start_time.elapsed().unwrap_or_default();
        if elapsed + delay > self.max_elapsed {
            return RetryDecision::DoNotRetry;
        }

        RetryDecision::Retry {
            execute_after: SystemTime::now() + delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delay() {
        let policy = BackoffPolicy::new(3, Duration::from_secs(30))
            .with_base_delay(Duration::from_secs(1));

        assert_eq!(policy.exponential_delay(0).as_secs(), 1);
        assert_eq!(policy.exponential_delay(1).as_secs(), 2);
        assert_eq!(policy.exponential_delay(2).as_secs(), 4);
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = BackoffPolicy::new(10, Duration::from_secs(30));
        assert!(policy.exponential_delay(10) <= policy.max_delay);
    }

    #[test]
    fn test_stops_after_max_retries() {
        let policy = BackoffPolicy::new(2, Duration::from_secs(30));
        assert!(matches!(
            policy.should_retry(SystemTime::now(), 2),
            RetryDecision::DoNotRetry
        ));
        assert!(matches!(
            policy.should_retry(SystemTime::now(), 1),
            RetryDecision::Retry { .. }
        ));
    }

    #[test]
    fn test_stops_when_budget_exhausted() {
        let policy = BackoffPolicy::new(5, Duration::from_secs(1));
        let started = SystemTime::now() - Duration::from_secs(2);
        assert!(matches!(
            policy.should_retry(started, 0),
            RetryDecision::DoNotRetry
        ));
    }
}
