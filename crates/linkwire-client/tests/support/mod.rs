//! Scripted transport for driving the connection manager by hand.
//!
//! Every `open` is recorded together with its event sink, so a test can play
//! the role of the network: report the open, push frames, fail or close.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use linkwire_client::config::ClientSettings;
use linkwire_client::connection::ConnectionManager;
use linkwire_client::dispatch::{Dispatcher, Topic};
use linkwire_client::transport::{Connector, EventSink, Link, TransportEvent};
use linkwire_core::protocol::{Envelope, Frame};

/// One `Connector::open` call.
pub struct MockLinkState {
    pub address: String,
    pub sink: EventSink,
    pub sent: Mutex<Vec<String>>,
    pub closed: Mutex<Option<(u16, String)>>,
    pub accept: Mutex<bool>,
}

#[derive(Default)]
pub struct MockConnector {
    links: Mutex<Vec<Arc<MockLinkState>>>,
}

impl MockConnector {
    pub fn open_count(&self) -> usize {
        self.links.lock().len()
    }

    pub fn link(&self, i: usize) -> Arc<MockLinkState> {
        Arc::clone(&self.links.lock()[i])
    }

    pub fn last(&self) -> Arc<MockLinkState> {
        Arc::clone(self.links.lock().last().expect("no link opened"))
    }
}

impl Connector for MockConnector {
    fn open(&self, address: &str, events: EventSink) -> Box<dyn Link> {
        let state = Arc::new(MockLinkState {
            address: address.to_owned(),
            sink: events,
            sent: Mutex::new(Vec::new()),
            closed: Mutex::new(None),
            accept: Mutex::new(true),
        });
        self.links.lock().push(Arc::clone(&state));
        Box::new(MockLink(state))
    }
}

struct MockLink(Arc<MockLinkState>);

impl Link for MockLink {
    fn send_text(&self, text: String) -> bool {
        if !*self.0.accept.lock() {
            return false;
        }
        self.0.sent.lock().push(text);
        true
    }

    fn close(&self, code: u16, reason: &str) {
        *self.0.closed.lock() = Some((code, reason.to_owned()));
    }
}

impl MockLinkState {
    pub async fn open(&self) {
        assert!(self.sink.emit(TransportEvent::Opened).await);
        settle().await;
    }

    pub async fn text(&self, raw: &str) {
        assert!(self.sink.emit(TransportEvent::Frame(Frame::Text(raw.to_owned()))).await);
        settle().await;
    }

    pub async fn envelope(&self, env: &Envelope) {
        self.text(&serde_json::to_string(env).unwrap()).await;
    }

    pub async fn fail(&self, err: &str) {
        assert!(self.sink.emit(TransportEvent::Failed(err.to_owned())).await);
        settle().await;
    }

    pub async fn close_from_peer(&self, code: u16, reason: &str) {
        let ev = TransportEvent::Closing {
            code,
            reason: reason.to_owned(),
        };
        assert!(self.sink.emit(ev).await);
        settle().await;
    }

    /// Everything the manager handed to this link, decoded.
    pub fn sent_envelopes(&self) -> Vec<Envelope> {
        self.sent
            .lock()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    pub fn refuse_sends(&self) {
        *self.accept.lock() = false;
    }
}

/// Let the event loop and delivery task drain without moving the clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

pub fn manager_with(settings: &ClientSettings) -> (ConnectionManager, Arc<MockConnector>) {
    let connector = Arc::new(MockConnector::default());
    let rt = Handle::current();
    let dispatcher = Dispatcher::new(&rt);
    let manager = ConnectionManager::new(settings, connector.clone(), dispatcher, &rt);
    (manager, connector)
}

pub fn manager() -> (ConnectionManager, Arc<MockConnector>) {
    manager_with(&ClientSettings::default())
}

/// Collect every envelope matching `topic` into a channel.
pub fn collect(d: &Dispatcher, topic: Topic) -> mpsc::UnboundedReceiver<Envelope> {
    let (tx, rx) = mpsc::unbounded_channel();
    d.subscribe_fn(topic, move |env| {
        let _ = tx.send(env.clone());
    });
    rx
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Vec<Envelope> {
    let mut out = Vec::new();
    while let Ok(env) = rx.try_recv() {
        out.push(env);
    }
    out
}
