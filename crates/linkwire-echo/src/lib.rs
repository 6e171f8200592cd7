//! Development echo server speaking the linkwire envelope protocol.
//!
//! Used by integration tests and for manual runs of the client. One route,
//! `GET /ws`, upgrades to a WebSocket; every session:
//! - greets with a `connect` envelope
//! - answers each inbound envelope according to its type
//! - pings every 20 s and drops the peer after 60 s without traffic

pub mod session;

use axum::{routing::get, Router};
use tokio::net::TcpListener;

/// Demo bearer token handed out on login.
pub const TEST_TOKEN: &str = "test_token_123456";

pub fn router() -> Router {
    Router::new().route("/ws", get(session::ws_upgrade))
}

/// Serve until the listener fails.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    axum::serve(listener, router()).await
}
