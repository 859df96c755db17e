//! No-op [`AuthStore`].
//!
//! Discards all writes and returns nothing on reads. Running without a
//! persistence backend is a valid configuration, not an error.

use async_trait::async_trait;
use crossbar_core::{AuthRecord, AuthRequest};

use super::AuthStore;

/// No-op audit store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl AuthStore for NullStore {
    async fn save_authorization(
        &self,
        _request: &AuthRequest,
        _region: &str,
        _approved: bool,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_transaction(&self, _stan: &str) -> anyhow::Result<Option<AuthRecord>> {
        Ok(None)
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
