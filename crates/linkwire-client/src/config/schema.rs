use std::time::Duration;

use serde::Deserialize;
use linkwire_core::error::{LinkError, Result};

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_MAX_RECONNECT_COUNT: u32 = 999;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;
pub const DEFAULT_PING_INTERVAL_MS: u64 = 20_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

/// Raw startup configuration as written in `linkwire.yaml`.
///
/// Numeric fields are kept signed so that zero or negative values can be
/// recognised and replaced by defaults in [`ClientConfig::settings`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ClientConfig {
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub connect_timeout: Option<i64>,

    #[serde(default)]
    pub heartbeat_interval: Option<i64>,

    #[serde(default)]
    pub max_reconnect_count: Option<i64>,

    #[serde(default)]
    pub reconnect_delay: Option<i64>,

    #[serde(default)]
    pub ping_interval: Option<i64>,

    #[serde(default)]
    pub read_timeout: Option<i64>,

    #[serde(default)]
    pub auth_success_markers: Vec<String>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(LinkError::BadRequest(
                    "serverUrl must start with ws:// or wss://".into(),
                ));
            }
        }
        Ok(())
    }

    /// Effective settings with defaults applied.
    pub fn settings(&self) -> ClientSettings {
        let markers: Vec<String> = self
            .auth_success_markers
            .iter()
            .filter(|m| !m.is_empty())
            .cloned()
            .collect();

        ClientSettings {
            connect_timeout: Duration::from_millis(positive_or(
                self.connect_timeout,
                DEFAULT_CONNECT_TIMEOUT_MS,
            )),
            heartbeat_interval: Duration::from_millis(positive_or(
                self.heartbeat_interval,
                DEFAULT_HEARTBEAT_INTERVAL_MS,
            )),
            max_reconnect_count: match self.max_reconnect_count {
                Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
                _ => DEFAULT_MAX_RECONNECT_COUNT,
            },
            reconnect_delay: Duration::from_millis(positive_or(
                self.reconnect_delay,
                DEFAULT_RECONNECT_DELAY_MS,
            )),
            ping_interval: Duration::from_millis(positive_or(
                self.ping_interval,
                DEFAULT_PING_INTERVAL_MS,
            )),
            read_timeout: Duration::from_millis(positive_or(
                self.read_timeout,
                DEFAULT_READ_TIMEOUT_MS,
            )),
            auth_success_markers: if markers.is_empty() {
                default_success_markers()
            } else {
                markers
            },
        }
    }
}

fn positive_or(v: Option<i64>, default: u64) -> u64 {
    match v {
        Some(n) if n > 0 => n as u64,
        _ => default,
    }
}

fn default_success_markers() -> Vec<String> {
    vec!["成功".to_string(), "success".to_string()]
}

/// Normalized runtime settings consumed by the connection manager and the
/// auth coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub max_reconnect_count: u32,
    pub reconnect_delay: Duration,
    /// Transport-level ping period.
    pub ping_interval: Duration,
    /// Grace period after a ping; a link silent for `ping_interval +
    /// read_timeout` is considered dead.
    pub read_timeout: Duration,
    pub auth_success_markers: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientConfig::default().settings()
    }
}
