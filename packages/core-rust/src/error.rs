//! Error types for framing and field-level message handling.

/// Errors produced while framing, packing, or unpacking wire messages.
///
/// Frame-level variants (`FrameTooLarge`, `EmptyFrame`, `Io`) indicate the
/// connection can no longer be trusted and should be closed. Field-level
/// variants describe a single malformed message; the connection stays usable.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Length prefix announces a frame larger than the configured maximum.
    #[error("frame of {len} bytes exceeds maximum {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Length prefix announces a zero-byte frame.
    #[error("zero-length frame")]
    EmptyFrame,

    /// Payload ends partway through a field slot.
    #[error("payload truncated inside field {field}: {remaining} of {width} bytes")]
    TruncatedField {
        field: u8,
        width: usize,
        remaining: usize,
    },

    /// Bytes remain after the last envelope slot.
    #[error("{remaining} bytes beyond the recognized envelope")]
    TrailingBytes { remaining: usize },

    /// A field slot contains non-ASCII bytes.
    #[error("field {field} contains non-ASCII bytes")]
    NonAscii { field: u8 },

    /// A value does not fit its fixed field slot.
    #[error("value of {len} chars does not fit field {field} (width {width})")]
    Oversized { field: u8, len: usize, width: usize },

    /// The field number is not part of the recognized envelope.
    #[error("field {field} is not part of the envelope")]
    UnknownField { field: u8 },

    /// A required field is absent from the message.
    #[error("missing required field {field}")]
    MissingField { field: u8 },

    /// The message class (MTI) is not one this endpoint accepts.
    #[error("unsupported message class {mti:?}")]
    UnsupportedMessageClass { mti: String },

    /// Underlying stream error surfaced through the codec.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}
