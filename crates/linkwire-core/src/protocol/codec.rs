//! Envelope codec (panic-free).
//!
//! - Text frames => Envelope
//! - Binary frames => Envelope, when the bytes are UTF-8 JSON
//!
//! Unknown `type` tags are kept as `MessageType::Other`; unknown fields are
//! ignored so the server may extend the envelope.

use bytes::Bytes;

use crate::error::{LinkError, Result};
use crate::protocol::envelope::Envelope;

/// A data frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// Serialize an envelope to its JSON text form.
pub fn encode(env: &Envelope) -> Result<String> {
    serde_json::to_string(env).map_err(|e| LinkError::Encode(format!("envelope json: {e}")))
}

/// Parse a JSON text payload.
pub fn decode(text: &str) -> Result<Envelope> {
    serde_json::from_str(text).map_err(|e| LinkError::Decode(format!("invalid envelope json: {e}")))
}

/// Decode a transport frame of either kind.
pub fn decode_frame(frame: Frame) -> Result<Envelope> {
    match frame {
        Frame::Text(s) => decode(&s),
        Frame::Binary(b) => {
            let s = std::str::from_utf8(&b)
                .map_err(|e| LinkError::Decode(format!("binary frame is not utf-8: {e}")))?;
            decode(s)
        }
    }
}
