//! Exponential backoff with jitter for failing sources.

use std::time::Duration;

use crate::error::{CollectionError, ErrorKind};

/// Backoff parameters shared by all source tasks.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Deterministic delay after `failures` consecutive failures:
    /// `base * 2^(failures - 1)`, capped at `max`.
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exp = (failures - 1).min(30);
        self.base
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max)
            .min(self.max)
    }

    /// Delay to wait before retrying after `err`, with ±25 % jitter.
    ///
    /// A rate-limit hint raises the result to at least the hinted wait, even
    /// past `max`.
    #[must_use]
    pub fn delay_for(&self, failures: u32, err: &CollectionError) -> Duration {
        let jittered = jitter(self.delay(failures));
        match (err.kind(), err.retry_after()) {
            (ErrorKind::RateLimited, Some(hint)) => jittered.max(hint),
            _ => jittered,
        }
    }
}

fn jitter(delay: Duration) -> Duration {
    delay.mul_f64(rand::random::<f64>() * 0.5 + 0.75)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
        }
    }

    #[test]
    fn delay_doubles_per_failure() {
        let p = policy();
        assert_eq!(p.delay(0), Duration::ZERO);
        assert_eq!(p.delay(1), Duration::from_secs(1));
        assert_eq!(p.delay(2), Duration::from_secs(2));
        assert_eq!(p.delay(3), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_capped() {
        let p = policy();
        assert_eq!(p.delay(7), Duration::from_secs(60));
        assert_eq!(p.delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_quarter() {
        let p = policy();
        let err = CollectionError::Transient("boom".to_owned());
        for _ in 0..200 {
            let d = p.delay_for(3, &err);
            assert!(d >= Duration::from_secs(3), "{d:?} below -25%");
            assert!(d <= Duration::from_secs(5), "{d:?} above +25%");
        }
    }

    #[test]
    fn retry_after_hint_sets_floor() {
        let p = policy();
        let err = CollectionError::RateLimited {
            retry_after_secs: Some(120),
        };
        assert!(p.delay_for(1, &err) >= Duration::from_secs(120));
    }
}
