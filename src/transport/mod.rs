//! Byte-level plumbing between the socket and the protocol lines.

mod codec;
pub mod tcp;

pub use codec::{DEFAULT_MAX_LINE_LENGTH, FramingError, LineCodec};
