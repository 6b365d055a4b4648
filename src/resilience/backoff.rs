//! Jittered exponential backoff between directive attempts.

use std::time::Duration;

use rand::Rng;

use crate::resilience::retries::RetryPolicy;

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based; 0 means the first attempt).
    ///
    /// Doubles from `base_delay_ms` per retry up to `max_delay_ms`, plus up to
    /// a tenth of that as jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let Some(exponent) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };

        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let delay_ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);

        let spread = delay_ms / 10;
        let jitter_ms = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..spread)
        };
        Duration::from_millis(delay_ms + jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_delay_ms: u64, max_delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries: 5,
            base_delay_ms,
            max_delay_ms,
        }
    }

    #[test]
    fn test_first_attempt_waits_nothing() {
        assert_eq!(policy(200, 2000).backoff(0), Duration::ZERO);
    }

    #[test]
    fn test_doubles_then_caps() {
        let p = policy(200, 1000);
        let first = p.backoff(1).as_millis();
        assert!((200..220).contains(&first));
        assert!(p.backoff(2).as_millis() >= 400);

        let capped = p.backoff(10).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[test]
    fn test_large_retry_numbers_saturate() {
        let d = policy(u64::MAX / 2, 5000).backoff(200);
        assert!(d.as_millis() >= 5000);
    }
}
