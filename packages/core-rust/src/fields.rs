//! The recognized fixed-field envelope.
//!
//! Messages carry a known set of fields in a fixed canonical order with no
//! bitmap and no per-field length indicators. Each field occupies a fixed
//! slot; senders and receivers agree on the envelope composition out of band.

/// Field numbers of the recognized envelope.
pub mod field {
    /// Message type indicator, 4 chars.
    pub const MTI: u8 = 0;
    /// Primary account number, 19-char slot (12–19 digit values).
    pub const PAN: u8 = 2;
    /// Transaction amount, 12 digits, zero-padded, no decimal.
    pub const AMOUNT: u8 = 4;
    /// Transmission date and time, MMDDhhmmss.
    pub const TRANSMISSION_TIME: u8 = 7;
    /// System trace audit number, 6 digits.
    pub const STAN: u8 = 11;
    /// Response code, 2 chars, replies only.
    pub const RESPONSE_CODE: u8 = 39;
}

/// The envelope in canonical wire order: `(field number, slot width)`.
pub const ENVELOPE: [(u8, usize); 6] = [
    (field::MTI, 4),
    (field::PAN, 19),
    (field::AMOUNT, 12),
    (field::TRANSMISSION_TIME, 10),
    (field::STAN, 6),
    (field::RESPONSE_CODE, 2),
];

/// Fields a request must carry beyond the MTI.
pub const REQUIRED: [u8; 4] = [
    field::PAN,
    field::AMOUNT,
    field::TRANSMISSION_TIME,
    field::STAN,
];

/// Returns the slot width of a recognized field, or `None` for unknown fields.
#[must_use]
pub fn width(field: u8) -> Option<usize> {
    ENVELOPE.iter().find(|(f, _)| *f == field).map(|(_, w)| *w)
}
