//! Transport layer (WebSocket client).
//!
//! The connection manager never touches sockets directly. It asks a
//! [`Connector`] to open a [`Link`] and receives everything that happens on
//! that link as [`TransportEvent`]s over a bounded channel, tagged with the
//! epoch of the link that produced them.

pub mod ws;

use tokio::sync::mpsc;

use linkwire_core::protocol::Frame;

pub use ws::WsConnector;

/// WebSocket close code for a normal, client-initiated closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Something the transport observed on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed; the link can carry frames.
    Opened,
    /// A data frame arrived.
    Frame(Frame),
    /// The peer started a close handshake.
    Closing { code: u16, reason: String },
    /// Connect refused, timed out, or the link broke mid-session.
    Failed(String),
}

/// Sending half handed to a connector for one link.
#[derive(Debug, Clone)]
pub struct EventSink {
    epoch: u64,
    tx: mpsc::Sender<(u64, TransportEvent)>,
}

impl EventSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::Sender<(u64, TransportEvent)>) -> Self {
        Self { epoch, tx }
    }

    /// Epoch of the link this sink belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Report an event. Returns false once the manager is gone.
    pub async fn emit(&self, ev: TransportEvent) -> bool {
        self.tx.send((self.epoch, ev)).await.is_ok()
    }
}

/// An open (or opening) connection. Both operations return immediately.
pub trait Link: Send + Sync {
    /// Queue a text frame. `true` means the link accepted it for delivery.
    fn send_text(&self, text: String) -> bool;

    /// Start a close handshake with the given code and reason.
    fn close(&self, code: u16, reason: &str);
}

/// Opens links. Implementations must not block: connection progress is
/// reported later through the sink.
pub trait Connector: Send + Sync {
    fn open(&self, address: &str, events: EventSink) -> Box<dyn Link>;
}
