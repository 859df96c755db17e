//! The workflow's three activities: screen, dispatch, and audit.
//!
//! Activities hold the collaborator handles; the engine owns sequencing,
//! deadlines, retries, and state persistence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use crossbar_core::{AuthRequest, AuthResponse};

use crate::audit::{AuditEntry, TransactionLog};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::screen::{FraudScreen, ScreenError, ScreenVerdict};
use crate::storage::AuthStore;

/// Collaborators invoked by the payment workflow.
pub struct Activities {
    screen: Arc<dyn FraudScreen>,
    dispatcher: Arc<Dispatcher>,
    audit_log: Arc<dyn TransactionLog>,
    store: Arc<dyn AuthStore>,
}

impl Activities {
    #[must_use]
    pub fn new(
        screen: Arc<dyn FraudScreen>,
        dispatcher: Arc<Dispatcher>,
        audit_log: Arc<dyn TransactionLog>,
        store: Arc<dyn AuthStore>,
    ) -> Self {
        Self {
            screen,
            dispatcher,
            audit_log,
            store,
        }
    }

    /// The primary region the route table selects for a PAN.
    #[must_use]
    pub fn primary_region(&self, pan: &str) -> &str {
        self.dispatcher.route_region(pan)
    }

    /// Runs the fraud screen.
    ///
    /// # Errors
    ///
    /// Propagates `ScreenError`; the engine treats errors fail-open.
    pub async fn screen(&self, request: &AuthRequest) -> Result<ScreenVerdict, ScreenError> {
        let start = Instant::now();
        let verdict = self.screen.analyze(request).await;
        tracing::debug!(
            stan = %request.stan,
            elapsed_ms = start.elapsed().as_millis() as u64,
            outcome = ?verdict.as_ref().map(|v| matches!(v, ScreenVerdict::Pass { .. })),
            "screen activity complete"
        );
        verdict
    }

    /// Runs the regional dispatch.
    ///
    /// # Errors
    ///
    /// Propagates `DispatchError`; retryability is decided by the error.
    pub async fn dispatch(
        &self,
        request: &mut AuthRequest,
    ) -> Result<AuthResponse, DispatchError> {
        self.dispatcher.dispatch(request).await
    }

    /// Writes the audit trail for a completed transaction.
    ///
    /// Always emits the transaction-log entry. When `persist_record` is set
    /// (workflow-synthesized declines, where the dispatcher never ran to
    /// completion) the store record is written here as well.
    ///
    /// # Errors
    ///
    /// Returns the first sink error; the engine logs it and leaves the reply
    /// untouched.
    pub async fn audit(
        &self,
        request: &AuthRequest,
        response: &AuthResponse,
        workflow_id: &str,
        persist_record: bool,
        tags: BTreeMap<String, String>,
    ) -> anyhow::Result<()> {
        let entry = AuditEntry::from_outcome(request, response, workflow_id, tags);
        self.audit_log
            .log_transaction(&entry)
            .await
            .context("transaction log write failed")?;

        if persist_record {
            let region = request
                .region
                .clone()
                .unwrap_or_else(|| self.primary_region(&request.pan).to_string());
            self.store
                .save_authorization(request, &region, response.approved())
                .await
                .context("audit store write failed")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crossbar_core::codes;

    use super::*;
    use crate::routing::{BreakerConfig, HealthRegistry, RouteTable};
    use crate::screen::NullScreen;
    use crate::storage::MemoryStore;
    use crate::testsupport::auth_request;

    fn activities(store: Arc<MemoryStore>) -> Activities {
        let mut routes = BTreeMap::new();
        routes.insert("4".to_string(), "us_east".to_string());
        let table = RouteTable::build(&routes, "us_east").unwrap();
        let health = Arc::new(HealthRegistry::new(["us_east"], BreakerConfig::default()));
        let dispatcher = Arc::new(Dispatcher::new(
            table,
            health,
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            Arc::clone(&store) as Arc<dyn AuthStore>,
            None,
        ));
        Activities::new(
            Arc::new(NullScreen),
            dispatcher,
            Arc::new(crate::audit::NullLog),
            store,
        )
    }

    #[tokio::test]
    async fn audit_without_persist_leaves_the_store_alone() {
        let store = Arc::new(MemoryStore::new());
        let acts = activities(Arc::clone(&store));
        let request = auth_request("4111111111111111", "000000005000", "000001");
        let response = AuthResponse::declined(&request, codes::APPROVED);

        acts.audit(&request, &response, "wf-1", false, BTreeMap::new())
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn audit_with_persist_writes_the_store_record() {
        let store = Arc::new(MemoryStore::new());
        let acts = activities(Arc::clone(&store));
        let mut request = auth_request("4111111111111111", "000000005000", "000002");
        request.region = Some("us_east".to_string());
        let response = AuthResponse::declined(&request, codes::SUSPECTED_FRAUD);

        acts.audit(&request, &response, "wf-1", true, BTreeMap::new())
            .await
            .unwrap();

        let record = store.get_transaction("000002").await.unwrap().unwrap();
        assert_eq!(record.region, "us_east");
        assert!(!record.approved);
    }

    #[tokio::test]
    async fn audit_persist_falls_back_to_the_primary_route() {
        let store = Arc::new(MemoryStore::new());
        let acts = activities(Arc::clone(&store));
        // Region never set: the screen rejected before dispatch resolved it.
        let request = auth_request("4111111111111111", "000000005000", "000003");
        let response = AuthResponse::declined(&request, codes::SUSPECTED_FRAUD);

        acts.audit(&request, &response, "wf-1", true, BTreeMap::new())
            .await
            .unwrap();

        let record = store.get_transaction("000003").await.unwrap().unwrap();
        assert_eq!(record.region, "us_east");
    }
}
