//! tokio-tungstenite backed connector.
//!
//! Each link is one spawned task that owns the socket:
//! - connect with a handshake timeout, then report `Opened`
//! - outbound writer fed by a bounded queue (`Link::send_text` is `try_send`)
//! - inbound reader that forwards data frames and close/failure events
//! - transport ping every `ping_interval`; a link with no inbound traffic for
//!   `ping_interval + read_timeout` is reported as failed
//!
//! Pings from the peer are answered by tungstenite itself.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use linkwire_core::protocol::Frame;

use crate::config::ClientSettings;

use super::{Connector, EventSink, Link, TransportEvent};

const OUTBOUND_QUEUE: usize = 1024;
// No status code present (RFC 6455 7.4.1).
const NO_STATUS_RCVD: u16 = 1005;

enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Debug, Clone, Copy)]
struct LinkTimings {
    connect_timeout: Duration,
    ping_interval: Duration,
    read_timeout: Duration,
}

pub struct WsConnector {
    timings: LinkTimings,
    runtime: Handle,
}

impl WsConnector {
    pub fn new(settings: &ClientSettings, runtime: Handle) -> Self {
        Self {
            timings: LinkTimings {
                connect_timeout: settings.connect_timeout,
                ping_interval: settings.ping_interval,
                read_timeout: settings.read_timeout,
            },
            runtime,
        }
    }
}

impl Connector for WsConnector {
    fn open(&self, address: &str, events: EventSink) -> Box<dyn Link> {
        let (out_tx, out_rx) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE);
        self.runtime.spawn(run_link(
            address.to_owned(),
            self.timings,
            out_rx,
            events,
        ));
        Box::new(WsLink { tx: out_tx })
    }
}

struct WsLink {
    tx: mpsc::Sender<Outbound>,
}

impl Link for WsLink {
    fn send_text(&self, text: String) -> bool {
        self.tx.try_send(Outbound::Text(text)).is_ok()
    }

    fn close(&self, code: u16, reason: &str) {
        let _ = self.tx.try_send(Outbound::Close {
            code,
            reason: reason.to_owned(),
        });
    }
}

async fn run_link(
    address: String,
    timings: LinkTimings,
    mut out_rx: mpsc::Receiver<Outbound>,
    events: EventSink,
) {
    let epoch = events.epoch();
    let connect_timeout = timings.connect_timeout;

    let stream = match tokio::time::timeout(
        connect_timeout,
        tokio_tungstenite::connect_async(address.as_str()),
    )
    .await
    {
        Ok(Ok((stream, _resp))) => stream,
        Ok(Err(e)) => {
            events.emit(TransportEvent::Failed(e.to_string())).await;
            return;
        }
        Err(_) => {
            events
                .emit(TransportEvent::Failed(format!(
                    "connect timed out after {}ms",
                    connect_timeout.as_millis()
                )))
                .await;
            return;
        }
    };

    tracing::debug!(%address, epoch, "websocket handshake complete");
    if !events.emit(TransportEvent::Opened).await {
        return;
    }

    let (mut ws_tx, mut ws_rx) = stream.split();

    let ping_every = timings.ping_interval;
    let dead_after = timings.ping_interval + timings.read_timeout;
    let mut ping_tick = tokio::time::interval_at(Instant::now() + ping_every, ping_every);
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(Outbound::Text(s)) => {
                        if let Err(e) = ws_tx.send(Message::text(s)).await {
                            events.emit(TransportEvent::Failed(e.to_string())).await;
                            break;
                        }
                    }
                    Some(Outbound::Close { code, reason }) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        };
                        let _ = ws_tx.send(Message::Close(Some(frame))).await;
                        let _ = ws_tx.close().await;
                        break;
                    }
                    // Link handle dropped.
                    None => {
                        let _ = ws_tx.close().await;
                        break;
                    }
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                last_activity = Instant::now();
                match incoming {
                    Some(Ok(Message::Text(t))) => {
                        events.emit(TransportEvent::Frame(Frame::Text(t.as_str().to_owned()))).await;
                    }
                    Some(Ok(Message::Binary(b))) => {
                        events.emit(TransportEvent::Frame(Frame::Binary(b))).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                            .unwrap_or((NO_STATUS_RCVD, String::new()));
                        events.emit(TransportEvent::Closing { code, reason }).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        events.emit(TransportEvent::Failed(e.to_string())).await;
                        break;
                    }
                    None => {
                        events.emit(TransportEvent::Failed("connection reset by peer".into())).await;
                        break;
                    }
                }
            }

            // ping
            _ = ping_tick.tick() => {
                if let Err(e) = ws_tx.send(Message::Ping(Default::default())).await {
                    events.emit(TransportEvent::Failed(e.to_string())).await;
                    break;
                }
            }

            // dead peer
            _ = tokio::time::sleep_until(last_activity + dead_after) => {
                tracing::warn!(%address, epoch, silent_ms = dead_after.as_millis() as u64, "no traffic from peer");
                events
                    .emit(TransportEvent::Failed(format!(
                        "ping timeout: no traffic for {}ms",
                        dead_after.as_millis()
                    )))
                    .await;
                break;
            }
        }
    }

    tracing::debug!(%address, epoch, "websocket link task finished");
}
