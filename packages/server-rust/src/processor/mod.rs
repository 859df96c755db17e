//! Regional processor contract and in-process demo processors.
//!
//! The router talks to each region through [`AuthProcessor`]; production
//! deployments put a real RPC client behind it, tests and single-binary demos
//! use the in-process processors in this module.

pub mod eu_west;
pub mod us_east;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use crossbar_core::{AuthRecord, AuthRequest, AuthResponse};

use crate::storage::AuthStore;

pub use eu_west::EuWestProcessor;
pub use us_east::UsEastProcessor;

/// Errors a regional processor can surface to the dispatcher. These are the
/// retryable class; deadline handling lives in the dispatcher itself.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("region unavailable: {0}")]
    Unavailable(String),
    #[error("processor fault: {0}")]
    Internal(String),
}

/// The processor-facing RPC contract. Deadlines are imposed by the caller.
#[async_trait]
pub trait AuthProcessor: Send + Sync {
    /// Authorizes one transaction.
    async fn process_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ProcessorError>;

    /// Looks up a previously processed transaction. Processors without a
    /// store report nothing; absence is not an error.
    async fn get_transaction(&self, _stan: &str) -> Result<Option<AuthRecord>, ProcessorError> {
        Ok(None)
    }
}

/// Region name → processor, populated at startup and read-only thereafter.
pub type ProcessorMap = HashMap<String, Arc<dyn AuthProcessor>>;

/// Wraps a processor with an audit store so `get_transaction` resolves
/// against persisted outcomes.
pub struct StoreBacked {
    inner: Arc<dyn AuthProcessor>,
    store: Arc<dyn AuthStore>,
}

impl StoreBacked {
    pub fn new(inner: Arc<dyn AuthProcessor>, store: Arc<dyn AuthStore>) -> Self {
        Self { inner, store }
    }
}

#[async_trait]
impl AuthProcessor for StoreBacked {
    async fn process_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ProcessorError> {
        self.inner.process_auth(request).await
    }

    async fn get_transaction(&self, stan: &str) -> Result<Option<AuthRecord>, ProcessorError> {
        self.store
            .get_transaction(stan)
            .await
            .map_err(|e| ProcessorError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn request() -> AuthRequest {
        AuthRequest {
            mti: "0100".to_string(),
            pan: "4111111111111111".to_string(),
            amount: "000000005000".to_string(),
            transmission_time: "0704120000".to_string(),
            stan: "000001".to_string(),
            region: None,
        }
    }

    #[tokio::test]
    async fn bare_processor_reports_no_transactions() {
        let processor = UsEastProcessor::new();
        assert!(processor.get_transaction("000001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_backed_processor_resolves_transactions() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_authorization(&request(), "us_east", true)
            .await
            .unwrap();

        let wrapped = StoreBacked::new(Arc::new(UsEastProcessor::new()), store);
        let record = wrapped.get_transaction("000001").await.unwrap().unwrap();
        assert_eq!(record.region, "us_east");

        // process_auth still delegates to the inner processor.
        let response = wrapped.process_auth(&request()).await.unwrap();
        assert_eq!(response.response_code, "00");
    }
}
