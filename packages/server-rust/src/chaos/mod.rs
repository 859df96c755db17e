//! Fault injection for resilience testing.
//!
//! When enabled, the dispatcher consults the engine at the top of every
//! dispatch; the engine either does nothing, sleeps for a bounded random
//! delay, or produces a synthetic error that exercises the retry path.

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// Chaos configuration. Disabled by default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub enabled: bool,
    /// Probability in `[0.0, 1.0]` that a given dispatch is disturbed.
    pub fault_probability: f64,
    /// Upper bound for injected delays.
    pub max_delay_ms: u64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fault_probability: 0.1,
            max_delay_ms: 500,
        }
    }
}

/// A synthetic fault produced by the engine.
#[derive(Debug, thiserror::Error)]
#[error("injected fault: {0}")]
pub struct ChaosFault(pub &'static str);

const FAULTS: [&str; 4] = [
    "simulated network error",
    "simulated service unavailable",
    "simulated connection reset",
    "simulated internal error",
];

/// Config-gated fault injector.
#[derive(Debug)]
pub struct ChaosEngine {
    config: ChaosConfig,
    rng: Mutex<SmallRng>,
}

impl ChaosEngine {
    #[must_use]
    pub fn new(config: ChaosConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }

    /// Possibly disturbs the current dispatch: sleeps for a random delay or
    /// returns a synthetic error. Returns `Ok(())` untouched dispatches.
    ///
    /// # Errors
    ///
    /// Returns `ChaosFault` for the error half of injected faults.
    pub async fn maybe_inject(&self) -> Result<(), ChaosFault> {
        if !self.config.enabled {
            return Ok(());
        }

        // Decide under the lock, act after releasing it.
        let action = {
            let mut rng = self.rng.lock();
            if rng.gen::<f64>() >= self.config.fault_probability {
                None
            } else if rng.gen::<bool>() {
                Some(Action::Delay(rng.gen_range(0..=self.config.max_delay_ms)))
            } else {
                Some(Action::Error(FAULTS[rng.gen_range(0..FAULTS.len())]))
            }
        };

        match action {
            None => Ok(()),
            Some(Action::Delay(ms)) => {
                tracing::debug!(delay_ms = ms, "chaos: injecting delay");
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(())
            }
            Some(Action::Error(msg)) => {
                tracing::debug!(fault = msg, "chaos: injecting error");
                Err(ChaosFault(msg))
            }
        }
    }
}

enum Action {
    Delay(u64),
    Error(&'static str),
}
