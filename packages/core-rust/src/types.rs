//! Internal request, response, and audit record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::response_mti;

/// Response codes used by the router and its regional processors.
pub mod codes {
    /// Approved.
    pub const APPROVED: &str = "00";
    /// Do not honor (business decline).
    pub const DO_NOT_HONOR: &str = "05";
    /// Invalid transaction.
    pub const INVALID_TRANSACTION: &str = "12";
    /// Invalid card number.
    pub const INVALID_CARD: &str = "14";
    /// Suspected fraud (screen reject).
    pub const SUSPECTED_FRAUD: &str = "59";
    /// Issuer or switch inoperative (regional timeout).
    pub const SWITCH_INOPERATIVE: &str = "91";
    /// System malfunction (dispatch exhausted).
    pub const SYSTEM_MALFUNCTION: &str = "96";
}

/// An authorization request in internal form, produced from an inbound frame.
///
/// `stan` is the correlation key and is carried unmodified through the full
/// round-trip. `region` is empty until the dispatcher resolves a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub mti: String,
    pub pan: String,
    pub amount: String,
    pub transmission_time: String,
    pub stan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl AuthRequest {
    /// The bank identification number: the leading six digits of the PAN,
    /// or `None` for PANs shorter than six characters.
    #[must_use]
    pub fn bin(&self) -> Option<&str> {
        self.pan.get(..6)
    }
}

/// A processor's (or the router's synthesized) reply in internal form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub mti: String,
    pub pan: String,
    pub amount: String,
    pub transmission_time: String,
    pub stan: String,
    pub response_code: String,
    #[serde(default)]
    pub processing_time_ms: u64,
}

impl AuthResponse {
    /// Synthesizes a decline reply for `request` with the given response
    /// code: reply-class MTI, all other fields echoed from the request.
    #[must_use]
    pub fn declined(request: &AuthRequest, response_code: &str) -> Self {
        Self {
            mti: response_mti(&request.mti),
            pan: request.pan.clone(),
            amount: request.amount.clone(),
            transmission_time: request.transmission_time.clone(),
            stan: request.stan.clone(),
            response_code: response_code.to_string(),
            processing_time_ms: 0,
        }
    }

    /// True iff the response code means approved.
    #[must_use]
    pub fn approved(&self) -> bool {
        self.response_code == codes::APPROVED
    }
}

/// One persisted authorization outcome, keyed by `stan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRecord {
    pub stan: String,
    pub pan: String,
    pub amount: String,
    /// The region that actually served the request.
    pub region: String,
    pub approved: bool,
    pub transmission_time: String,
    /// Commit timestamp, assigned by the store.
    pub inserted_at: DateTime<Utc>,
}

/// Masks a PAN for logging: `4111111111111111` → `411111******1111`.
/// Values of ten characters or fewer are returned unchanged.
#[must_use]
pub fn mask_pan(pan: &str) -> String {
    if pan.len() <= 10 {
        return pan.to_string();
    }
    format!("{}******{}", &pan[..6], &pan[pan.len() - 4..])
}
