//! Demo EU-West regional processor.

use std::time::Instant;

use async_trait::async_trait;
use crossbar_core::{codes, mask_pan, response_mti, AuthRequest, AuthResponse};
use rand::Rng;

use super::{AuthProcessor, ProcessorError};

/// In-process stand-in for the EU-West regional processor.
///
/// Higher simulated latency than US-East (50–200 ms). Demo policy: amounts
/// above €400 are not honored, and night-time transactions (23:00–05:00 by
/// transmission time) above €200 are flagged as suspected fraud.
#[derive(Debug, Default, Clone, Copy)]
pub struct EuWestProcessor;

impl EuWestProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// True when the MMDDhhmmss transmission time falls between 23:00 and 05:00.
fn is_night_time(transmission_time: &str) -> bool {
    transmission_time
        .get(4..6)
        .and_then(|h| h.parse::<u32>().ok())
        .is_some_and(|hour| hour >= 23 || hour < 5)
}

#[async_trait]
impl AuthProcessor for EuWestProcessor {
    async fn process_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ProcessorError> {
        let start = Instant::now();
        tracing::debug!(
            region = "eu_west",
            stan = %request.stan,
            pan = %mask_pan(&request.pan),
            "processing auth request"
        );

        let delay_ms = { rand::thread_rng().gen_range(50..=200) };
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let mut response = AuthResponse {
            mti: response_mti(&request.mti),
            pan: request.pan.clone(),
            amount: request.amount.clone(),
            transmission_time: request.transmission_time.clone(),
            stan: request.stan.clone(),
            response_code: codes::APPROVED.to_string(),
            processing_time_ms: elapsed_ms,
        };

        let Ok(amount_cents) = request.amount.trim().parse::<u64>() else {
            response.response_code = codes::INVALID_TRANSACTION.to_string();
            return Ok(response);
        };

        // €400.00 regional limit.
        if amount_cents > 40_000 {
            response.response_code = codes::DO_NOT_HONOR.to_string();
            tracing::debug!(stan = %request.stan, amount_cents, "declined: over regional limit");
        }

        // Night-time transactions above €200.00 look like fraud.
        if is_night_time(&request.transmission_time) && amount_cents > 20_000 {
            response.response_code = codes::SUSPECTED_FRAUD.to_string();
            tracing::debug!(stan = %request.stan, "declined: suspicious night-time transaction");
        }

        Ok(response)
    }
}
