//! linkwire core: the wire envelope, its codec, and the shared error type.
//!
//! This crate defines the message contract spoken between the client
//! connection manager and the server. It carries no transport or runtime
//! dependencies so the same types serve the client, the echo server and
//! test tooling.
//!
//! # Panic policy
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed input surfaces as `LinkError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, LinkError};
pub use protocol::{Envelope, MessageType};
