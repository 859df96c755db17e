//! Demo US-East regional processor.

use std::time::Instant;

use async_trait::async_trait;
use crossbar_core::{codes, mask_pan, response_mti, AuthRequest, AuthResponse};
use rand::Rng;

use super::{AuthProcessor, ProcessorError};

/// In-process stand-in for the US-East regional processor.
///
/// Simulates 10–100 ms of processing and applies the region's demo policy:
/// unparseable amounts are invalid transactions, amounts above $500 are not
/// honored, and PANs ending in `0` are treated as invalid card numbers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsEastProcessor;

impl UsEastProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthProcessor for UsEastProcessor {
    async fn process_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ProcessorError> {
        let start = Instant::now();
        tracing::debug!(
            region = "us_east",
            stan = %request.stan,
            pan = %mask_pan(&request.pan),
            "processing auth request"
        );

        let delay_ms = { rand::thread_rng().gen_range(10..=100) };
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

        // $500.00 regional limit.
        if amount_cents > 50_000 {
            response.response_code = codes::DO_NOT_HONOR.to_string();
            tracing::debug!(stan = %request.stan, amount_cents, "declined: over regional limit");
        }

        if request.pan.ends_with('0') {
            response.response_code = codes::INVALID_CARD.to_string();
            tracing::debug!(stan = %request.stan, "declined: invalid card number");
        }

        Ok(response)
    }
}
