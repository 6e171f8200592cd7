//! Client config loader (strict parsing, forgiving startup).
//!
//! `load_from_str`/`load_from_file` reject malformed or unknown keys.
//! `load_or_default` is what the client uses at startup: any failure is
//! logged and the compiled-in defaults are used instead.

pub mod schema;

use std::fs;
use std::path::Path;

use linkwire_core::error::{LinkError, Result};

pub use schema::{ClientConfig, ClientSettings};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let s = fs::read_to_string(path.as_ref())
        .map_err(|e| LinkError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = serde_yaml::from_str(s)
        .map_err(|e| LinkError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Read the config once; fall back to defaults if it is missing or invalid.
pub fn load_or_default(path: impl AsRef<Path>) -> ClientConfig {
    let path = path.as_ref();
    match load_from_file(path) {
        Ok(cfg) => {
            let s = cfg.settings();
            tracing::info!(
                path = %path.display(),
                heartbeat_ms = s.heartbeat_interval.as_millis() as u64,
                max_reconnect = s.max_reconnect_count,
                reconnect_delay_ms = s.reconnect_delay.as_millis() as u64,
                "config loaded"
            );
            cfg
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config unavailable, using defaults");
            ClientConfig::default()
        }
    }
}
