//! Translation between the fixed-field wire form and the internal records.
//!
//! The translator does no I/O and holds no state. Replies always echo fields
//! 2, 4, 7, and 11 from the original inbound frame, never from the
//! processor's response, so the echo is byte-identical on every path. All
//! reply construction funnels through [`reply_frame`], which is the only
//! place that echo is implemented.

use crate::error::WireError;
use crate::fields::{field, REQUIRED};
use crate::message::{response_mti, IsoMessage};
use crate::types::{AuthRequest, AuthResponse};

/// Builds an internal request from an inbound frame.
///
/// # Errors
///
/// Returns `WireError::MissingField` when the MTI or any of fields 2, 4, 7,
/// or 11 is absent.
pub fn request_from_frame(frame: &IsoMessage) -> Result<AuthRequest, WireError> {
    let require = |f: u8| {
        frame
            .get(f)
            .map(str::to_string)
            .ok_or(WireError::MissingField { field: f })
    };

    for f in REQUIRED {
        if frame.get(f).is_none() {
            return Err(WireError::MissingField { field: f });
        }
    }

    Ok(AuthRequest {
        mti: require(field::MTI)?,
        pan: require(field::PAN)?,
        amount: require(field::AMOUNT)?,
        transmission_time: require(field::TRANSMISSION_TIME)?,
        stan: require(field::STAN)?,
        region: None,
    })
}

/// Builds a reply frame: the given MTI, fields 2, 4, 7, and 11 echoed from
/// `original` where present, and the given response code.
///
/// This is the single constructor for every outbound reply, so the
/// byte-for-byte echo of the inbound fields has exactly one implementation.
///
/// # Errors
///
/// Returns `WireError::Oversized` when the MTI or code does not fit its
/// slot.
pub fn reply_frame(
    original: &IsoMessage,
    mti: &str,
    response_code: &str,
) -> Result<IsoMessage, WireError> {
    let mut reply = IsoMessage::with_mti(mti)?;

    for f in REQUIRED {
        if let Some(value) = original.get(f) {
            reply.set(f, value)?;
        }
    }

    reply.set(field::RESPONSE_CODE, response_code)?;
    Ok(reply)
}

/// Builds an outbound reply frame from an internal response.
///
/// The MTI and response code come from `response`; the echoed fields come
/// from `original`, never from the response.
///
/// # Errors
///
/// Returns `WireError::Oversized` when the response MTI or code does not fit
/// its slot (a processor contract violation).
pub fn response_to_frame(
    response: &AuthResponse,
    original: &IsoMessage,
) -> Result<IsoMessage, WireError> {
    reply_frame(original, &response.mti, &response.response_code)
}

/// Synthesizes a decline reply directly from the inbound frame: reply-class
/// MTI, echoed fields, and the given decline code. For paths where no
/// processor response exists (regional timeout, screen reject, dispatch
/// exhausted).
///
/// # Errors
///
/// Returns `WireError::Oversized` when the code does not fit its slot.
pub fn decline_frame(original: &IsoMessage, code: &str) -> Result<IsoMessage, WireError> {
    let mti = response_mti(original.mti().unwrap_or(""));
    reply_frame(original, &mti, code)
}
