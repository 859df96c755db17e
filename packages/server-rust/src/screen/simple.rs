//! Rule-based fraud screen: high-risk BINs, amount thresholds, and a
//! per-PAN velocity check.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossbar_core::{mask_pan, AuthRequest};
use parking_lot::Mutex;

use super::{FraudScreen, ScreenError, ScreenVerdict};

/// How long per-PAN history is retained.
const HISTORY_RETENTION: Duration = Duration::from_secs(3600);
/// Window the velocity rule counts transactions over.
const VELOCITY_WINDOW: Duration = Duration::from_secs(300);

/// In-process rule-based screen.
///
/// Rules, in order:
/// 1. High-risk BIN above half the amount threshold → reject.
/// 2. Amount above the threshold → pass with a verification note.
/// 3. More than `velocity_threshold` transactions for the same PAN within
///    the velocity window → reject.
pub struct SimpleFraudScreen {
    high_risk_bins: Vec<String>,
    /// Threshold in minor units (cents).
    amount_threshold: u64,
    velocity_threshold: usize,
    recent: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for SimpleFraudScreen {
    fn default() -> Self {
        Self {
            high_risk_bins: vec!["431274".to_string(), "557788".to_string()],
            amount_threshold: 100_000, // $1000.00
            velocity_threshold: 3,
            recent: Mutex::new(HashMap::new()),
        }
    }
}

impl SimpleFraudScreen {
    /// Creates a screen with the default rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a screen with an explicit high-risk BIN list and threshold
    /// (in minor units).
    #[must_use]
    pub fn with_rules(high_risk_bins: Vec<String>, amount_threshold: u64) -> Self {
        Self {
            high_risk_bins,
            amount_threshold,
            ..Self::default()
        }
    }

    /// Records the transaction for `pan` and returns true when the velocity
    /// rule trips.
    fn velocity_exceeded(&self, pan: &str) -> bool {
        let now = Instant::now();
        let mut recent = self.recent.lock();
        let history = recent.entry(pan.to_string()).or_default();

        history.retain(|t| now.duration_since(*t) < HISTORY_RETENTION);
        history.push(now);

        let windowed = history
            .iter()
            .filter(|t| now.duration_since(**t) < VELOCITY_WINDOW)
            .count();
        windowed > self.velocity_threshold
    }
}

#[async_trait]
impl FraudScreen for SimpleFraudScreen {
    async fn analyze(&self, request: &AuthRequest) -> Result<ScreenVerdict, ScreenError> {
        let amount: u64 = request
            .amount
            .trim()
            .parse()
            .map_err(|_| ScreenError::InvalidAmount(request.amount.clone()))?;

        if let Some(bin) = request.bin() {
            if self.high_risk_bins.iter().any(|b| b == bin) && amount > self.amount_threshold / 2 {
                return Ok(ScreenVerdict::Reject {
                    reason: format!("high-risk BIN {} with amount {}", bin, amount),
                });
            }
        }

        if self.velocity_exceeded(&request.pan) {
            return Ok(ScreenVerdict::Reject {
                reason: format!(
                    "velocity limit exceeded for PAN {}",
                    mask_pan(&request.pan)
                ),
            });
        }

        if amount > self.amount_threshold {
            return Ok(ScreenVerdict::Pass {
                note: Some(format!(
                    "amount {} above threshold, additional verification advised",
                    amount
                )),
            });
        }

        Ok(ScreenVerdict::Pass { note: None })
    }
}
