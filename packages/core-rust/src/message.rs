//! Fixed-field message representation and the slot-based pack/unpack rules.

use std::collections::BTreeMap;

use crate::error::WireError;
use crate::fields::{self, field, ENVELOPE};

/// A fixed-field message: an ordered map from field number to field value.
///
/// Values are stored unpadded. On the wire each field occupies its fixed slot
/// width; values shorter than the slot (only the PAN in practice) are
/// right-padded with ASCII spaces on pack and trimmed on unpack, so
/// `pack(unpack(bytes)) == bytes` for any well-formed payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IsoMessage {
    values: BTreeMap<u8, String>,
}

impl IsoMessage {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message with the given message type indicator.
    ///
    /// # Errors
    ///
    /// Returns `WireError::Oversized` if `mti` does not fit the MTI slot.
    pub fn with_mti(mti: &str) -> Result<Self, WireError> {
        let mut msg = Self::new();
        msg.set(field::MTI, mti)?;
        Ok(msg)
    }

    /// Sets a field value.
    ///
    /// # Errors
    ///
    /// Returns `WireError::UnknownField` for field numbers outside the
    /// envelope and `WireError::Oversized` for values longer than the slot.
    pub fn set(&mut self, field: u8, value: &str) -> Result<(), WireError> {
        let width = fields::width(field).ok_or(WireError::UnknownField { field })?;
        if value.len() > width {
            return Err(WireError::Oversized {
                field,
                len: value.len(),
                width,
            });
        }
        if !value.is_ascii() {
            return Err(WireError::NonAscii { field });
        }
        self.values.insert(field, value.to_string());
        Ok(())
    }

    /// Returns a field value, if set.
    #[must_use]
    pub fn get(&self, field: u8) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Returns the message type indicator, if set.
    #[must_use]
    pub fn mti(&self) -> Option<&str> {
        self.get(field::MTI)
    }

    /// Returns true when no fields are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Packs the message into its wire form: present fields in canonical
    /// order, each padded to its slot width.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (field, width) in ENVELOPE {
            if let Some(value) = self.values.get(&field) {
                out.extend_from_slice(value.as_bytes());
                out.resize(out.len() + (width - value.len()), b' ');
            }
        }
        out
    }

    /// Unpacks a payload by consuming envelope slots in canonical order
    /// until the payload is exhausted. Trailing spaces in each slot are
    /// trimmed from the stored value.
    ///
    /// # Errors
    ///
    /// Returns `WireError::TruncatedField` when the remaining bytes end
    /// partway through the next slot, `WireError::TrailingBytes` when the
    /// payload runs past the last slot, and `WireError::NonAscii` when a
    /// slot holds non-ASCII bytes.
    pub fn unpack(payload: &[u8]) -> Result<Self, WireError> {
        let mut msg = Self::new();
        let mut rest = payload;

        for (field, width) in ENVELOPE {
            if rest.is_empty() {
                break;
            }
            if rest.len() < width {
                return Err(WireError::TruncatedField {
                    field,
                    width,
                    remaining: rest.len(),
                });
            }
            let (slot, tail) = rest.split_at(width);
            let value = std::str::from_utf8(slot)
                .ok()
                .filter(|s| s.is_ascii())
                .ok_or(WireError::NonAscii { field })?;
            msg.values
                .insert(field, value.trim_end_matches(' ').to_string());
            rest = tail;
        }

        if !rest.is_empty() {
            return Err(WireError::TrailingBytes {
                remaining: rest.len(),
            });
        }

        Ok(msg)
    }
}

/// Maps a request MTI to its reply-class MTI: the third character flips from
/// `0` to `1` (`"0100"` → `"0110"`, `"0800"` → `"0810"`). Malformed MTIs
/// fall back to `"0110"`.
#[must_use]
pub fn response_mti(request_mti: &str) -> String {
    let bytes = request_mti.as_bytes();
    if bytes.len() != 4 || bytes[2] != b'0' {
        return "0110".to_string();
    }
    format!("{}1{}", &request_mti[..2], &request_mti[3..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> IsoMessage {
        let mut msg = IsoMessage::with_mti("0100").unwrap();
        msg.set(field::PAN, "4111111111111111").unwrap();
        msg.set(field::AMOUNT, "000000005000").unwrap();
        msg.set(field::TRANSMISSION_TIME, "0704120000").unwrap();
        msg.set(field::STAN, "000001").unwrap();
        msg
    }

    #[test]
    fn pack_pads_short_values_to_slot_width() {
        let packed = request().pack();
        // 4 + 19 + 12 + 10 + 6
        assert_eq!(packed.len(), 51);
        // 16-digit PAN padded to the 19-char slot.
        assert_eq!(&packed[4..23], b"4111111111111111   ");
    }

    #[test]
    fn unpack_trims_slot_padding() {
        let msg = IsoMessage::unpack(&request().pack()).unwrap();
        assert_eq!(msg.get(field::PAN), Some("4111111111111111"));
        assert_eq!(msg.get(field::STAN), Some("000001"));
    }

    #[test]
    fn pack_unpack_roundtrip_is_identity() {
        let packed = request().pack();
        let reparsed = IsoMessage::unpack(&packed).unwrap();
        assert_eq!(reparsed, request());
        assert_eq!(reparsed.pack(), packed);
    }

    #[test]
    fn unpack_mti_only_payload() {
        let msg = IsoMessage::unpack(b"0800").unwrap();
        assert_eq!(msg.mti(), Some("0800"));
        assert_eq!(msg.get(field::PAN), None);
    }

    #[test]
    fn unpack_reply_envelope_with_response_code() {
        let mut reply = request();
        reply.set(field::MTI, "0110").unwrap();
        reply.set(field::RESPONSE_CODE, "00").unwrap();
        let packed = reply.pack();
        assert_eq!(packed.len(), 53);

        let reparsed = IsoMessage::unpack(&packed).unwrap();
        assert_eq!(reparsed.get(field::RESPONSE_CODE), Some("00"));
    }

    #[test]
    fn unpack_rejects_partial_slot() {
        // MTI plus 5 bytes: not enough for the 19-char PAN slot.
        let err = IsoMessage::unpack(b"010041111").unwrap_err();
        assert!(matches!(
            err,
            WireError::TruncatedField {
                field: field::PAN,
                width: 19,
                remaining: 5,
            }
        ));
    }

    #[test]
    fn unpack_rejects_bytes_past_the_envelope() {
        let mut reply = request();
        reply.set(field::RESPONSE_CODE, "00").unwrap();
        let mut payload = reply.pack();
        payload.extend_from_slice(b"xx");

        let err = IsoMessage::unpack(&payload).unwrap_err();
        assert!(matches!(err, WireError::TrailingBytes { remaining: 2 }));
    }

    #[test]
    fn unpack_rejects_non_ascii() {
        let mut payload = request().pack();
        payload[5] = 0xFF;
        let err = IsoMessage::unpack(&payload).unwrap_err();
        assert!(matches!(err, WireError::NonAscii { field: field::PAN }));
    }

    #[test]
    fn set_rejects_oversized_value() {
        let mut msg = IsoMessage::new();
        let err = msg.set(field::STAN, "1234567").unwrap_err();
        assert!(matches!(
            err,
            WireError::Oversized {
                field: field::STAN,
                len: 7,
                width: 6,
            }
        ));
    }

    #[test]
    fn set_rejects_unknown_field() {
        let mut msg = IsoMessage::new();
        let err = msg.set(3, "x").unwrap_err();
        assert!(matches!(err, WireError::UnknownField { field: 3 }));
    }

    #[test]
    fn response_mti_flips_third_character() {
        assert_eq!(response_mti("0100"), "0110");
        assert_eq!(response_mti("0800"), "0810");
        assert_eq!(response_mti("0200"), "0210");
    }

    #[test]
    fn response_mti_falls_back_on_malformed_input() {
        assert_eq!(response_mti("01"), "0110");
        assert_eq!(response_mti("0110"), "0110");
        assert_eq!(response_mti(""), "0110");
    }
}
