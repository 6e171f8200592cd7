//! Envelope fan-out on a single delivery task.
//!
//! All envelopes and posted callbacks go through one unbounded job queue and
//! are executed by one task, in order. That task is the client's single
//! execution context: subscribers never observe two envelopes concurrently
//! or out of publish order.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use linkwire_core::protocol::{Envelope, MessageType};

/// Envelope consumer. Runs on the delivery task.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn on_envelope(&self, env: &Envelope);
}

/// Adapter for plain closures.
pub struct FnSubscriber<F>(pub F);

#[async_trait]
impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&Envelope) + Send + Sync,
{
    async fn on_envelope(&self, env: &Envelope) {
        (self.0)(env)
    }
}

/// Which envelopes a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    All,
    Only(MessageType),
}

impl Topic {
    fn matches(&self, ty: &MessageType) -> bool {
        match self {
            Topic::All => true,
            Topic::Only(t) => t == ty,
        }
    }
}

/// Handle returned by [`Dispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    topic: Topic,
    subscriber: Arc<dyn Subscriber>,
}

type Job = Box<dyn FnOnce() + Send>;

enum Task {
    Deliver(Envelope),
    Run(Job),
}

/// Registry keyed by ascending id, so iteration order is registration order.
#[derive(Default)]
struct Registry {
    entries: RwLock<BTreeMap<SubscriptionId, Registration>>,
    next_id: AtomicU64,
}

impl Registry {
    fn targets(&self, ty: &MessageType) -> Vec<Arc<dyn Subscriber>> {
        self.entries
            .read()
            .values()
            .filter(|r| r.topic.matches(ty))
            .map(|r| Arc::clone(&r.subscriber))
            .collect()
    }
}

/// Publish/subscribe hub. Cheap to clone; all clones share one delivery task.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    tasks: mpsc::UnboundedSender<Task>,
}

impl Dispatcher {
    /// Create the dispatcher and spawn its delivery task on `runtime`.
    pub fn new(runtime: &Handle) -> Self {
        let registry = Arc::new(Registry::default());
        let (tasks, rx) = mpsc::unbounded_channel();
        runtime.spawn(delivery_loop(Arc::clone(&registry), rx));
        Self { registry, tasks }
    }

    pub fn subscribe(&self, topic: Topic, subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry
            .entries
            .write()
            .insert(id, Registration { topic, subscriber });
        id
    }

    /// Subscribe a plain closure.
    pub fn subscribe_fn<F>(&self, topic: Topic, f: F) -> SubscriptionId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(FnSubscriber(f)))
    }

    /// Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.entries.write().remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.entries.read().len()
    }

    /// Queue an envelope for delivery to every matching subscriber.
    pub fn publish(&self, env: Envelope) {
        if self.tasks.send(Task::Deliver(env)).is_err() {
            tracing::warn!("delivery task stopped, envelope dropped");
        }
    }

    /// Run `f` on the delivery task, after everything queued before it.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tasks.send(Task::Run(Box::new(f))).is_err() {
            tracing::warn!("delivery task stopped, callback dropped");
        }
    }
}

async fn delivery_loop(registry: Arc<Registry>, mut rx: mpsc::UnboundedReceiver<Task>) {
    while let Some(task) = rx.recv().await {
        match task {
            Task::Deliver(env) => {
                for sub in registry.targets(&env.msg_type) {
                    let res = AssertUnwindSafe(sub.on_envelope(&env)).catch_unwind().await;
                    if res.is_err() {
                        tracing::error!(msg_type = %env.msg_type, "subscriber panicked");
                    }
                }
            }
            Task::Run(job) => {
                if std::panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("posted callback panicked");
                }
            }
        }
    }
    tracing::debug!("delivery loop finished");
}
