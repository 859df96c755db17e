//! Crossbar Core — fixed-field message model, frame codec, and protocol
//! translation shared by the router and its test tooling.

pub mod codec;
pub mod error;
pub mod fields;
pub mod message;
pub mod translate;
pub mod types;

pub use codec::FrameCodec;
pub use error::WireError;
pub use message::{response_mti, IsoMessage};
pub use translate::{decline_frame, reply_frame, request_from_frame, response_to_frame};
pub use types::{codes, mask_pan, AuthRecord, AuthRequest, AuthResponse};
