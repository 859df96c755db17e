//! Audit persistence for authorization outcomes.
//!
//! [`AuthStore`] is the capability contract the dispatcher and workflow write
//! through: insert-or-update keyed by STAN, with a store-assigned commit
//! timestamp. [`MemoryStore`] is the in-process implementation;
//! [`NullStore`] discards writes so the router can run without a backend.

pub mod memory;
pub mod null;

use async_trait::async_trait;
use chrono::Utc;
use crossbar_core::{AuthRecord, AuthRequest};

pub use memory::MemoryStore;
pub use null::NullStore;

/// Persistence contract for authorization outcomes.
///
/// `stan` is the unique key with insert-or-update semantics; re-saving the
/// same stan replaces the row, so the final row is deterministic in its
/// non-timestamp columns. `inserted_at` is assigned by the store at commit.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Persists the outcome of one authorization. `region` is the region
    /// that actually served the request.
    async fn save_authorization(
        &self,
        request: &AuthRequest,
        region: &str,
        approved: bool,
    ) -> anyhow::Result<()>;

    /// Looks up a transaction by stan. Absence is not an error.
    async fn get_transaction(&self, stan: &str) -> anyhow::Result<Option<AuthRecord>>;

    /// Releases backend resources. Idempotent.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Builds the record a store commits for `request`, stamping `inserted_at`.
#[must_use]
pub fn record_for(request: &AuthRequest, region: &str, approved: bool) -> AuthRecord {
    AuthRecord {
        stan: request.stan.clone(),
        pan: request.pan.clone(),
        amount: request.amount.clone(),
        region: region.to_string(),
        approved,
        transmission_time: request.transmission_time.clone(),
        inserted_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_for_copies_request_fields() {
        let request = AuthRequest {
            mti: "0100".to_string(),
            pan: "4111111111111111".to_string(),
            amount: "000000005000".to_string(),
            transmission_time: "0704120000".to_string(),
            stan: "000001".to_string(),
            region: Some("us_east".to_string()),
        };

        let record = record_for(&request, "eu_west", false);
        assert_eq!(record.stan, "000001");
        assert_eq!(record.pan, "4111111111111111");
        assert_eq!(record.amount, "000000005000");
        // The served region wins over whatever the request carries.
        assert_eq!(record.region, "eu_west");
        assert!(!record.approved);
    }
}
