//! Transaction audit logging.
//!
//! Every completed workflow emits one [`AuditEntry`] through the
//! [`TransactionLog`] capability. The log is advisory: failures are recorded
//! by the caller but never change the reply.

pub mod json_file;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbar_core::{mask_pan, AuthRequest, AuthResponse};
use serde::{Deserialize, Serialize};

pub use json_file::JsonFileLog;

/// One audit line summarizing a completed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub stan: String,
    /// Always masked; raw PANs never reach the audit trail.
    pub pan: String,
    pub amount: String,
    pub mti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub response_code: String,
    pub approved: bool,
    pub processing_time_ms: u64,
    pub transmission_time: String,
    pub workflow_id: String,
    pub timestamp: DateTime<Utc>,
    /// Free-form context: decline reasons, screen status, error details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl AuditEntry {
    /// Builds an entry from a request/response pair.
    #[must_use]
    pub fn from_outcome(
        request: &AuthRequest,
        response: &AuthResponse,
        workflow_id: &str,
        tags: BTreeMap<String, String>,
    ) -> Self {
        Self {
            stan: request.stan.clone(),
            pan: mask_pan(&request.pan),
            amount: request.amount.clone(),
            mti: request.mti.clone(),
            region: request.region.clone(),
            response_code: response.response_code.clone(),
            approved: response.approved(),
            processing_time_ms: response.processing_time_ms,
            transmission_time: request.transmission_time.clone(),
            workflow_id: workflow_id.to_string(),
            timestamp: Utc::now(),
            tags,
        }
    }
}

/// Audit logging contract.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Records one transaction. Must be durable per the sink's own contract.
    async fn log_transaction(&self, entry: &AuditEntry) -> anyhow::Result<()>;
}

/// Log that discards everything. Running without an audit sink is a valid
/// configuration, not an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

#[async_trait]
impl TransactionLog for NullLog {
    async fn log_transaction(&self, _entry: &AuditEntry) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbar_core::codes;

    fn outcome() -> (AuthRequest, AuthResponse) {
        let request = AuthRequest {
            mti: "0100".to_string(),
            pan: "4111111111111111".to_string(),
            amount: "000000005000".to_string(),
            transmission_time: "0704120000".to_string(),
            stan: "000001".to_string(),
            region: Some("us_east".to_string()),
        };
        let response = AuthResponse::declined(&request, codes::APPROVED);
        (request, response)
    }

    #[test]
    fn entry_masks_the_pan() {
        let (request, response) = outcome();
        let entry = AuditEntry::from_outcome(&request, &response, "wf-1", BTreeMap::new());
        assert_eq!(entry.pan, "411111******1111");
        assert_eq!(entry.region.as_deref(), Some("us_east"));
        assert!(entry.approved);
    }

    #[test]
    fn entry_serializes_without_empty_optionals() {
        let (mut request, response) = outcome();
        request.region = None;
        let entry = AuditEntry::from_outcome(&request, &response, "wf-1", BTreeMap::new());
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("region").is_none());
        assert!(json.get("tags").is_none());
    }

    #[tokio::test]
    async fn null_log_accepts_entries() {
        let (request, response) = outcome();
        let entry = AuditEntry::from_outcome(&request, &response, "wf-1", BTreeMap::new());
        NullLog.log_transaction(&entry).await.unwrap();
    }
}
