//! Exponential pause between consecutive receive failures.

use std::time::Duration;

use rand::Rng;

/// Tracks a run of consecutive failures and how long to pause after each.
#[derive(Debug, Clone)]
pub struct ErrorBackoff {
    failures: u32,
    base: Duration,
    max: Duration,
}

impl ErrorBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            failures: 0,
            base,
            max,
        }
    }

    /// Record a failure and return the pause before trying again.
    ///
    /// Doubles per consecutive failure up to `max`, plus up to 10% jitter.
    pub fn on_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let factor = 2u32.saturating_pow(self.failures - 1);
        let capped = self.base.saturating_mul(factor).min(self.max);

        let jitter_range = capped.as_millis() as u64 / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };
        capped + Duration::from_millis(jitter)
    }

    /// A success ends the run.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_then_caps() {
        let mut backoff = ErrorBackoff::new(Duration::from_millis(100), Duration::from_millis(1000));

        let first = backoff.on_failure().as_millis();
        assert!((100..110).contains(&first));
        let second = backoff.on_failure().as_millis();
        assert!((200..220).contains(&second));

        for _ in 0..10 {
            backoff.on_failure();
        }
        let capped = backoff.on_failure().as_millis();
        assert!((1000..1100).contains(&capped));
        assert_eq!(backoff.failures(), 13);
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = ErrorBackoff::new(Duration::from_millis(50), Duration::from_secs(1));
        backoff.on_failure();
        backoff.on_failure();
        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert!(backoff.on_failure() < Duration::from_millis(60));
    }
}
