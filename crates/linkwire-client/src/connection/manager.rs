//! Connection manager: one long-lived link, kept alive.
//!
//! Responsibilities:
//! - Own the link handle, the state machine and the bearer token
//! - Consume transport events in order (one event loop task)
//! - Start/stop the heartbeat on open/close, schedule reconnects on failure
//! - Decode inbound frames once and hand them to the dispatcher
//!
//! Every link is tagged with an epoch. `connect` and `disconnect` bump it, so
//! late events from a link that has been replaced or torn down are ignored.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use linkwire_core::protocol::{codec, Envelope, MessageType};

use crate::config::ClientSettings;
use crate::connection::{ConnectionState, HeartbeatScheduler, ReconnectScheduler};
use crate::dispatch::Dispatcher;
use crate::transport::{Connector, EventSink, Link, TransportEvent, NORMAL_CLOSURE};

const EVENT_QUEUE: usize = 256;

struct Conn {
    state: ConnectionState,
    link: Option<Box<dyn Link>>,
    address: Option<String>,
    epoch: u64,
}

struct Inner {
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    conn: Mutex<Conn>,
    token: RwLock<Option<String>>,
    heartbeat: HeartbeatScheduler,
    reconnect: ReconnectScheduler,
    events: mpsc::Sender<(u64, TransportEvent)>,
}

/// Handle to the process-wide connection manager. Clones share one instance.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Build the manager and spawn its event loop on `runtime`.
    pub fn new(
        settings: &ClientSettings,
        connector: Arc<dyn Connector>,
        dispatcher: Dispatcher,
        runtime: &Handle,
    ) -> Self {
        let (events, rx) = mpsc::channel(EVENT_QUEUE);
        let inner = Arc::new(Inner {
            connector,
            dispatcher,
            conn: Mutex::new(Conn {
                state: ConnectionState::Disconnected,
                link: None,
                address: None,
                epoch: 0,
            }),
            token: RwLock::new(None),
            heartbeat: HeartbeatScheduler::new(settings.heartbeat_interval, runtime.clone()),
            reconnect: ReconnectScheduler::new(
                settings.max_reconnect_count,
                settings.reconnect_delay,
                runtime.clone(),
            ),
            events,
        });
        runtime.spawn(event_loop(Arc::downgrade(&inner), rx));
        Self { inner }
    }

    /// Open a link to `address`, replacing any existing one.
    ///
    /// Returns immediately; the outcome arrives later as a `connect` or
    /// `disconnect` envelope on the dispatcher.
    pub fn connect(&self, address: &str) {
        self.inner.reconnect.clear_pending();
        self.inner.open(address);
    }

    /// Stop timers, close the link with a normal closure, go `Disconnected`.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Send an envelope; `false` if not connected or the link refused it.
    pub fn send(&self, env: Envelope) -> bool {
        self.inner.send(env)
    }

    pub fn send_message(&self, msg_type: MessageType, data: impl Into<String>) -> bool {
        self.inner.send(Envelope::new(msg_type, data))
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.inner.token.write() = Some(token.into());
        tracing::debug!("token set");
    }

    pub fn clear_token(&self) {
        *self.inner.token.write() = None;
        tracing::debug!("token cleared");
    }

    pub fn token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.conn.lock().state
    }

    /// Last address passed to `connect`.
    pub fn address(&self) -> Option<String> {
        self.inner.conn.lock().address.clone()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect.attempts()
    }

    pub fn heartbeat_running(&self) -> bool {
        self.inner.heartbeat.is_running()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}

impl Inner {
    fn is_connected(&self) -> bool {
        self.conn.lock().state == ConnectionState::Connected
    }

    fn open(&self, address: &str) {
        let was_connected = {
            let c = self.conn.lock();
            c.state == ConnectionState::Connected && c.link.is_some()
        };
        if was_connected {
            tracing::warn!(%address, "already connected, closing previous connection first");
            self.disconnect();
        }

        let (epoch, stale) = {
            let mut c = self.conn.lock();
            self.open_locked(&mut c, address)
        };

        if let Some(old) = stale {
            old.close(NORMAL_CLOSURE, "superseded");
        }
        tracing::info!(%address, epoch, "connecting");
    }

    /// Retry path. `failed_epoch` is the epoch of the link whose failure
    /// scheduled this retry; any `connect` or `disconnect` since then bumped
    /// the epoch and the retry is skipped.
    fn reopen(&self, failed_epoch: u64) {
        let (address, epoch) = {
            let mut c = self.conn.lock();
            if c.epoch != failed_epoch || c.state != ConnectionState::Disconnected {
                tracing::debug!(failed_epoch, current = c.epoch, "reconnect superseded, skipped");
                return;
            }
            let Some(address) = c.address.clone() else {
                tracing::warn!("reconnect skipped: no known address");
                return;
            };
            let (epoch, _) = self.open_locked(&mut c, &address);
            (address, epoch)
        };
        tracing::info!(%address, epoch, "reconnect: connecting");
    }

    /// Bump the epoch and start a new link. Returns the new epoch and the
    /// link it replaced.
    fn open_locked(&self, c: &mut Conn, address: &str) -> (u64, Option<Box<dyn Link>>) {
        c.epoch += 1;
        c.state = ConnectionState::Connecting;
        c.address = Some(address.to_owned());
        let sink = EventSink::new(c.epoch, self.events.clone());
        let link = self.connector.open(address, sink);
        (c.epoch, c.link.replace(link))
    }

    fn disconnect(&self) {
        {
            let mut c = self.conn.lock();
            if c.state != ConnectionState::Disconnected {
                c.state = ConnectionState::Closing;
            }
        }

        self.heartbeat.stop();
        self.reconnect.cancel();

        let link = {
            let mut c = self.conn.lock();
            c.epoch += 1;
            c.state = ConnectionState::Disconnected;
            c.link.take()
        };

        match link {
            Some(link) => {
                link.close(NORMAL_CLOSURE, "client disconnect");
                tracing::info!("disconnected");
            }
            None => tracing::debug!("disconnect: no active link"),
        }
    }

    fn send(&self, mut env: Envelope) -> bool {
        if env.token.is_none() {
            env.token = self.token.read().clone();
        }

        let c = self.conn.lock();
        let link = match (c.state, c.link.as_ref()) {
            (ConnectionState::Connected, Some(link)) => link,
            (state, _) => {
                tracing::warn!(msg_type = %env.msg_type, %state, "send failed: not connected");
                return false;
            }
        };

        let text = match codec::encode(&env) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(msg_type = %env.msg_type, error = %e, "send failed");
                return false;
            }
        };

        let accepted = link.send_text(text);
        if accepted {
            tracing::debug!(msg_type = %env.msg_type, "sent");
        } else {
            tracing::warn!(msg_type = %env.msg_type, "send failed: link refused frame");
        }
        accepted
    }

    fn heartbeat_tick(&self) {
        if !self.is_connected() {
            return;
        }
        if !self.send(Envelope::new(MessageType::Heartbeat, "ping")) {
            tracing::debug!("heartbeat dropped");
        }
    }

    /// Apply a state transition if `epoch` is still current.
    fn transition(&self, epoch: u64, state: ConnectionState, drop_link: bool) -> bool {
        let mut c = self.conn.lock();
        if c.epoch != epoch {
            return false;
        }
        c.state = state;
        if drop_link {
            c.link = None;
        }
        true
    }

    fn handle_event(self: &Arc<Self>, epoch: u64, ev: TransportEvent) {
        match ev {
            TransportEvent::Opened => {
                if !self.transition(epoch, ConnectionState::Connected, false) {
                    tracing::debug!(epoch, "ignoring open from stale link");
                    return;
                }
                tracing::info!(epoch, "connected");
                self.reconnect.reset();
                self.start_heartbeat();
                self.dispatcher
                    .publish(Envelope::new(MessageType::Connect, "connected"));
            }

            TransportEvent::Frame(frame) => {
                if self.conn.lock().epoch != epoch {
                    tracing::debug!(epoch, "ignoring frame from stale link");
                    return;
                }
                match codec::decode_frame(frame) {
                    Ok(env) if env.is_heartbeat() => tracing::debug!("heartbeat acknowledged"),
                    Ok(env) => {
                        tracing::debug!(msg_type = %env.msg_type, "received");
                        self.dispatcher.publish(env);
                    }
                    Err(e) => tracing::warn!(error = %e, "dropping undecodable frame"),
                }
            }

            TransportEvent::Closing { code, reason } => {
                if !self.transition(epoch, ConnectionState::Disconnected, true) {
                    tracing::debug!(epoch, "ignoring close from stale link");
                    return;
                }
                tracing::info!(code, %reason, "connection closing");
                self.heartbeat.stop();
                self.dispatcher
                    .publish(Envelope::new(MessageType::Disconnect, reason));
            }

            TransportEvent::Failed(err) => {
                if !self.transition(epoch, ConnectionState::Disconnected, true) {
                    tracing::debug!(epoch, "ignoring failure from stale link");
                    return;
                }
                tracing::error!(error = %err, "connection failed");
                self.heartbeat.stop();
                self.schedule_reconnect(epoch);
                self.dispatcher.publish(Envelope::new(
                    MessageType::Disconnect,
                    format!("connection failed: {err}"),
                ));
            }
        }
    }

    fn start_heartbeat(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.heartbeat.start(move || {
            if let Some(inner) = weak.upgrade() {
                inner.heartbeat_tick();
            }
        });
    }

    fn schedule_reconnect(self: &Arc<Self>, failed_epoch: u64) {
        let weak = Arc::downgrade(self);
        self.reconnect.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                inner.reopen(failed_epoch);
            }
        });
    }
}

async fn event_loop(inner: Weak<Inner>, mut rx: mpsc::Receiver<(u64, TransportEvent)>) {
    while let Some((epoch, ev)) = rx.recv().await {
        let Some(inner) = inner.upgrade() else { break };
        inner.handle_event(epoch, ev);
    }
    tracing::debug!("connection event loop finished");
}
