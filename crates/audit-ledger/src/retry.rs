use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub trait BackoffPolicy: Send + Sync {
    /// Delay before the attempt following `attempts` failed ones.
    fn delay_after(&self, attempts: u32) -> Duration;
    fn allowed(&self, attempts: u32) -> bool;
}

/// Exponential backoff with symmetric jitter, applied to append conflicts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_ms: u64,
    pub factor: f64,
    pub jitter: f64,
    pub cap_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_ms: 25,
            factor: 2.0,
            jitter: 0.2,
            cap_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl BackoffPolicy for RetryPolicy {
    fn delay_after(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::ZERO;
        }
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let exp_delay = (self.base_ms as f64) * self.factor.powi(exponent);
        let capped = exp_delay.min(self.cap_ms as f64);
        let jitter_factor = if self.jitter > 0.0 {
            let span = self.jitter.abs();
            1.0 + rand::thread_rng().gen_range(-span..=span)
        } else {
            1.0
        };
        let candidate = (capped * jitter_factor).clamp(0.0, self.cap_ms as f64);
        Duration::from_millis(candidate.round() as u64)
    }

    fn allowed(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_stay_capped() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(0), Duration::ZERO);
        assert_eq!(policy.delay_after(1), Duration::from_millis(25));
        assert_eq!(policy.delay_after(2), Duration::from_millis(50));
        assert_eq!(policy.delay_after(3), Duration::from_millis(100));
        assert_eq!(policy.delay_after(40), Duration::from_millis(1_000));
    }

    #[test]
    fn jitter_stays_within_span() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay_after(2).as_millis();
            assert!((40..=60).contains(&delay), "{delay}");
        }
    }

    #[test]
    fn attempts_are_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.allowed(4));
        assert!(!policy.allowed(5));
        assert!(!RetryPolicy::none().allowed(1));
    }
}
