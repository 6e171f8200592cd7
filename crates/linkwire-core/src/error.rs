//! Shared error type across linkwire crates.

use thiserror::Error;

/// Stable error codes, safe to log or show to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid input or configuration.
    BadRequest,
    /// Inbound payload could not be decoded.
    Decode,
    /// Outbound envelope could not be encoded.
    Encode,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Decode => "DECODE",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Unified error type used by core, client and echo server.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl LinkError {
    /// Map to a stable code.
    pub fn client_code(&self) -> ErrorCode {
        match self {
            LinkError::BadRequest(_) => ErrorCode::BadRequest,
            LinkError::Decode(_) => ErrorCode::Decode,
            LinkError::Encode(_) => ErrorCode::Encode,
            LinkError::Internal(_) => ErrorCode::Internal,
        }
    }
}
