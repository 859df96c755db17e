//! Per-step retry policy with exponential backoff.

use std::time::Duration;

/// Retry policy applied to workflow activities.
///
/// Attempt `n` (1-based) waits `initial_interval * backoff_coefficient^(n-1)`
/// before the next attempt, capped at `max_interval`. `max_attempts` bounds
/// the total number of invocations, not the number of retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            backoff_coefficient: 1.5,
            max_interval: Duration::from_secs(5),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before the attempt after `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_wrap)]
        let multiplier = self
            .backoff_coefficient
            .powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_interval.as_secs_f64() * multiplier;
        Duration::from_secs_f64(delay.min(self.max_interval.as_secs_f64()))
    }
}
