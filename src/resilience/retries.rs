//! Fixed-delay retry for sends the listener refused.

use std::time::Duration;

use rand::Rng;

use crate::config::DeliveryConfig;

/// Retry policy for connection-refused delivery failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Policy from settings, or `None` when retrying is off.
    pub fn from_config(config: &DeliveryConfig) -> Option<Self> {
        config.retry_refused.then(|| {
            Self::new(
                config.max_attempts,
                Duration::from_millis(config.retry_delay_ms),
            )
        })
    }

    /// Delay before the next attempt, with up to 10% jitter.
    pub fn backoff(&self) -> Duration {
        let base_ms = self.delay.as_millis() as u64;
        let jitter_range = base_ms / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };
        Duration::from_millis(base_ms + jitter)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Whether an I/O error means nobody is listening yet.
pub fn is_refused(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_stays_near_fixed_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        for _ in 0..20 {
            let d = policy.backoff().as_millis();
            assert!((500..550).contains(&d));
        }
    }

    #[test]
    fn disabled_in_config_means_no_policy() {
        let mut config = DeliveryConfig::default();
        assert!(RetryPolicy::from_config(&config).is_none());

        config.retry_refused = true;
        config.max_attempts = 4;
        let policy = RetryPolicy::from_config(&config).unwrap();
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn refused_kinds() {
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        let other = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(is_refused(&refused));
        assert!(!is_refused(&other));
    }
}
