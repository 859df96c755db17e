//! Pre-authorization fraud screen.
//!
//! The screen is a capability the workflow consults before dispatch. A
//! verdict either passes the transaction (optionally with a note) or rejects
//! it outright; screen *errors* are distinct from rejects and are handled
//! fail-open by the workflow.

pub mod simple;

use async_trait::async_trait;
use crossbar_core::AuthRequest;

pub use simple::SimpleFraudScreen;

/// Outcome of screening one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenVerdict {
    /// The transaction may proceed to dispatch.
    Pass { note: Option<String> },
    /// The transaction must be declined as suspected fraud.
    Reject { reason: String },
}

/// Screening failed; the transaction's risk is unknown.
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("amount {0:?} is not numeric")]
    InvalidAmount(String),
    #[error("screen backend error: {0}")]
    Backend(String),
}

/// Fraud screening contract.
#[async_trait]
pub trait FraudScreen: Send + Sync {
    /// Analyzes one authorization request.
    async fn analyze(&self, request: &AuthRequest) -> Result<ScreenVerdict, ScreenError>;
}

/// Screen that passes everything. Running without a screen is a valid
/// configuration, not an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScreen;

#[async_trait]
impl FraudScreen for NullScreen {
    async fn analyze(&self, _request: &AuthRequest) -> Result<ScreenVerdict, ScreenError> {
        Ok(ScreenVerdict::Pass { note: None })
    }
}
