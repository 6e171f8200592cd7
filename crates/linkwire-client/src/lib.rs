//! linkwire client library.
//!
//! A persistent WebSocket connection to a message server, with heartbeat,
//! bounded reconnection, typed fan-out of inbound envelopes and callback
//! style login/register on top. Consumed by the CLI binary (`main.rs`) and
//! by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_context;
pub mod auth;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod transport;

pub use app_context::AppContext;
