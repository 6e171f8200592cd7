//! linkwire echo server.
//!
//! Usage: `linkwire-echo [listen-addr]` (default `127.0.0.1:8080`).

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let listen = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let listen: SocketAddr = match listen.parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(%listen, error = %e, "listen address must be a valid SocketAddr");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(listen).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%listen, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%listen, "linkwire-echo starting");
    if let Err(e) = linkwire_echo::serve(listener).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
