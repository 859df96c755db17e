//! In-memory [`AuthStore`] keyed by STAN.

use async_trait::async_trait;
use crossbar_core::{AuthRecord, AuthRequest};
use dashmap::DashMap;

use super::{record_for, AuthStore};

/// Lock-free in-memory audit store.
///
/// Insert-or-update by stan; the latest save wins. Suited to single-node
/// runs and tests; an external backend replaces it behind the same trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, AuthRecord>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn save_authorization(
        &self,
        request: &AuthRequest,
        region: &str,
        approved: bool,
    ) -> anyhow::Result<()> {
        self.records
            .insert(request.stan.clone(), record_for(request, region, approved));
        Ok(())
    }

    async fn get_transaction(&self, stan: &str) -> anyhow::Result<Option<AuthRecord>> {
        Ok(self.records.get(stan).map(|r| r.value().clone()))
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
