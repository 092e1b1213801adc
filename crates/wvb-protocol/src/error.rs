//! Codec errors for the wire protocol.

use thiserror::Error;

/// Errors raised while moving data between Rust types and JSON.
///
/// Parsing raw frames never produces one of these (malformed frames decode
/// to `Value::Null`); they only surface from the typed helpers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A Rust value could not be encoded as JSON
    #[error("JSON encoding failed: {0}")]
    Encode(String),

    /// A JSON value did not match the requested Rust type
    #[error("Type conversion failed: {0}")]
    Decode(String),
}

impl CodecError {
    /// Create an encode error from any displayable cause.
    pub fn encode(cause: impl std::fmt::Display) -> Self {
        Self::Encode(cause.to_string())
    }

    /// Create a decode error from any displayable cause.
    pub fn decode(cause: impl std::fmt::Display) -> Self {
        Self::Decode(cause.to_string())
    }
}
