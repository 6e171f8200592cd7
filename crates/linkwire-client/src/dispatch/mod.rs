//! Dispatcher module exports.
//!
//! Re-exports the dispatcher and subscriber types so downstream consumers can
//! depend on this module directly.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, FnSubscriber, Subscriber, SubscriptionId, Topic};
