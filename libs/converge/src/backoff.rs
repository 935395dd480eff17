//! Delay between poll attempts.

use std::time::Duration;

use rand::Rng;

/// Smallest delay ever returned, so a zero base can never busy-loop.
const MIN_DELAY: Duration = Duration::from_millis(10);

/// Exponential backoff configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Base delay for the first retry.
    pub base: Duration,

    /// Maximum delay.
    pub max: Duration,

    /// Jitter factor (0.0 to 1.0).
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            max: Duration::from_secs(2),
            jitter: 0.1,
        }
    }
}

impl BackoffPolicy {
    /// A constant interval without jitter.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            base: interval,
            max: interval,
            jitter: 0.0,
        }
    }

    /// Calculate delay for the given attempt number (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.base.as_secs_f64() * 2.0_f64.powi(attempt.min(16) as i32);
        let delay = delay.min(self.max.as_secs_f64());

        let jitter = self.jitter.clamp(0.0, 1.0);
        let offset = if jitter > 0.0 {
            rand::rng().random_range(-jitter..=jitter) * delay
        } else {
            0.0
        };

        Duration::from_secs_f64(delay + offset).max(MIN_DELAY)
    }
}
