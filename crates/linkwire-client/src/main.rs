//! linkwire client CLI.
//!
//! Usage: `linkwire-client [ws://host:port/path] [username password]`
//!
//! Connects (address from the argument or `serverUrl` in `linkwire.yaml`),
//! optionally logs in once connected, and logs every dispatched envelope
//! until Ctrl-C.

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use linkwire_client::{config, dispatch::Topic, AppContext};
use linkwire_core::MessageType;

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut args = std::env::args().skip(1);
    let address = args.next();
    let credentials = match (args.next(), args.next()) {
        (Some(u), Some(p)) => Some((u, p)),
        _ => None,
    };

    let cfg = config::load_or_default("linkwire.yaml");
    let ctx = match AppContext::new(cfg) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "client init failed");
            return ExitCode::FAILURE;
        }
    };

    ctx.dispatcher().subscribe_fn(Topic::All, |env| {
        tracing::info!(msg_type = %env.msg_type, data = %env.data, "envelope");
    });

    if let Some((username, password)) = credentials {
        let login_ctx = ctx.clone();
        ctx.dispatcher()
            .subscribe_fn(Topic::Only(MessageType::Connect), move |_| {
                // servers may greet with their own `connect`
                if login_ctx.auth().has_pending() {
                    return;
                }
                login_ctx.auth().login(&username, &password, |res| match res {
                    Ok(ok) => tracing::info!(user = %ok.username, message = %ok.message, "logged in"),
                    Err(e) => tracing::warn!(error = %e, "login failed"),
                });
            });
    }

    let connected = match address {
        Some(addr) => {
            ctx.manager().connect(&addr);
            Ok(())
        }
        None => ctx.connect_default(),
    };
    if let Err(e) = connected {
        tracing::error!(error = %e, "no server address (pass one or set serverUrl)");
        return ExitCode::FAILURE;
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "signal handler failed");
    }
    ctx.auth().logout();
    ctx.manager().disconnect();
    tracing::info!("linkwire-client stopped");
    ExitCode::SUCCESS
}
