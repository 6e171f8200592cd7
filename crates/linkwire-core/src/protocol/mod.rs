//! Protocol modules: the JSON envelope and its codec.
//!
//! Every frame on the wire is one JSON envelope (`type`, `data`, `timestamp`,
//! optional `token` and `messageId`). Parsers are panic-free: malformed input
//! is reported as `LinkError::Decode` so the connection manager can drop it
//! and carry on.

pub mod codec;
pub mod envelope;

pub use codec::{decode, decode_frame, encode, Frame};
pub use envelope::{now_millis, Envelope, MessageType};
