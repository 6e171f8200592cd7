//! Auth coordinator.
//!
//! Turns `login`/`register` envelopes into callback-style calls over the
//! fire-and-forget connection:
//! - fail fast (no traffic) when offline or on blank credentials
//! - one pending request slot; a new call replaces an outstanding one and the
//!   replaced caller is never notified
//! - the first response of the pending kind resolves it; success is decided by
//!   a marker substring in `data`
//!
//! Every callback runs on the dispatcher's delivery task.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use thiserror::Error;

use linkwire_core::protocol::{Envelope, MessageType};

use crate::connection::ConnectionManager;
use crate::dispatch::{Subscriber, SubscriptionId, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Register,
}

impl AuthKind {
    pub fn message_type(self) -> MessageType {
        match self {
            AuthKind::Login => MessageType::Login,
            AuthKind::Register => MessageType::Register,
        }
    }

    fn from_message_type(ty: &MessageType) -> Option<Self> {
        match ty {
            MessageType::Login => Some(AuthKind::Login),
            MessageType::Register => Some(AuthKind::Register),
            _ => None,
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthKind::Login => "login",
            AuthKind::Register => "register",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("network not connected, connect to the server first")]
    NotConnected,
    #[error("username must not be empty")]
    BlankUsername,
    #[error("password must not be empty")]
    BlankPassword,
    #[error("failed to send {0} request")]
    SendFailed(AuthKind),
    /// Server answered without a success marker; carries its text.
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub kind: AuthKind,
    pub username: String,
    /// Server response text.
    pub message: String,
}

pub type AuthResult = Result<AuthSuccess, AuthError>;

type Callback = Box<dyn FnOnce(AuthResult) + Send>;

struct PendingAuthRequest {
    id: u64,
    kind: AuthKind,
    username: String,
    callback: Callback,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

pub struct AuthCoordinator {
    manager: ConnectionManager,
    success_markers: Vec<String>,
    pending: Mutex<Option<PendingAuthRequest>>,
    next_id: AtomicU64,
    current_user: RwLock<Option<String>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl AuthCoordinator {
    /// Create the coordinator and register it on the manager's dispatcher.
    pub fn new(manager: ConnectionManager, success_markers: Vec<String>) -> Arc<Self> {
        let this = Arc::new(Self {
            manager,
            success_markers,
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
            current_user: RwLock::new(None),
            subscription: Mutex::new(None),
        });

        let id = this
            .manager
            .dispatcher()
            .subscribe(Topic::All, Arc::new(AuthSubscriber(Arc::downgrade(&this))));
        *this.subscription.lock() = Some(id);
        this
    }

    pub fn login<F>(&self, username: &str, password: &str, callback: F)
    where
        F: FnOnce(AuthResult) + Send + 'static,
    {
        self.start(AuthKind::Login, username, password, Box::new(callback));
    }

    pub fn register<F>(&self, username: &str, password: &str, callback: F)
    where
        F: FnOnce(AuthResult) + Send + 'static,
    {
        self.start(AuthKind::Register, username, password, Box::new(callback));
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Username of the last successful login, until `logout`.
    pub fn current_username(&self) -> Option<String> {
        self.current_user.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user
            .read()
            .as_deref()
            .map(|u| !u.is_empty())
            .unwrap_or(false)
    }

    /// Best-effort `logout` envelope, then forget the user and the token.
    pub fn logout(&self) {
        let user = self.current_user.write().take();
        tracing::info!(user = user.as_deref().unwrap_or(""), "logout");
        if self.manager.is_connected() {
            self.manager
                .send_message(MessageType::Logout, user.unwrap_or_default());
        }
        self.manager.clear_token();
    }

    fn start(&self, kind: AuthKind, username: &str, password: &str, callback: Callback) {
        tracing::info!(%kind, %username, "auth request");

        if let Err(e) = self.validate(username, password) {
            tracing::warn!(%kind, error = %e, "auth request rejected locally");
            self.notify(callback, Err(e));
            return;
        }

        let data = match serde_json::to_string(&Credentials { username, password }) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(%kind, error = %e, "credential encoding failed");
                self.notify(callback, Err(AuthError::SendFailed(kind)));
                return;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let replaced = self.pending.lock().replace(PendingAuthRequest {
            id,
            kind,
            username: username.to_owned(),
            callback,
        });
        if let Some(prev) = replaced {
            tracing::warn!(
                previous = %prev.kind,
                %kind,
                "outstanding auth request replaced; its caller will not be notified"
            );
        }

        if self.manager.send_message(kind.message_type(), data) {
            tracing::debug!(%kind, "auth request sent");
            return;
        }

        tracing::error!(%kind, "auth request send failed");
        let ours = {
            let mut slot = self.pending.lock();
            match slot.as_ref() {
                Some(p) if p.id == id => slot.take(),
                _ => None,
            }
        };
        if let Some(p) = ours {
            self.notify(p.callback, Err(AuthError::SendFailed(kind)));
        }
    }

    fn validate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if !self.manager.is_connected() {
            return Err(AuthError::NotConnected);
        }
        if username.trim().is_empty() {
            return Err(AuthError::BlankUsername);
        }
        if password.trim().is_empty() {
            return Err(AuthError::BlankPassword);
        }
        Ok(())
    }

    fn notify(&self, callback: Callback, result: AuthResult) {
        self.manager.dispatcher().post(move || callback(result));
    }

    fn is_success(&self, data: &str) -> bool {
        self.success_markers.iter().any(|m| data.contains(m.as_str()))
    }

    fn on_response(&self, env: &Envelope) {
        let Some(kind) = AuthKind::from_message_type(&env.msg_type) else {
            return;
        };

        let pending = {
            let mut slot = self.pending.lock();
            match slot.as_ref() {
                None => {
                    tracing::warn!(%kind, "no pending auth request, response ignored");
                    return;
                }
                Some(p) if p.kind != kind => {
                    tracing::warn!(expected = %p.kind, got = %kind, "mismatched auth response ignored");
                    return;
                }
                Some(_) => slot.take(),
            }
        };
        let Some(p) = pending else { return };

        if self.is_success(&env.data) {
            tracing::info!(%kind, username = %p.username, "auth succeeded");
            if kind == AuthKind::Login {
                *self.current_user.write() = Some(p.username.clone());
            }
            if let Some(token) = env.token.as_deref().filter(|t| !t.is_empty()) {
                self.manager.set_token(token);
            }
            (p.callback)(Ok(AuthSuccess {
                kind,
                username: p.username,
                message: env.data.clone(),
            }));
        } else {
            tracing::warn!(%kind, response = %env.data, "auth failed");
            let msg = if env.data.is_empty() {
                format!("{kind} failed")
            } else {
                env.data.clone()
            };
            (p.callback)(Err(AuthError::Rejected(msg)));
        }
    }
}

impl Drop for AuthCoordinator {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.lock().take() {
            self.manager.dispatcher().unsubscribe(id);
        }
    }
}

/// Forwards dispatcher deliveries without keeping the coordinator alive.
struct AuthSubscriber(Weak<AuthCoordinator>);

#[async_trait]
impl Subscriber for AuthSubscriber {
    async fn on_envelope(&self, env: &Envelope) {
        if let Some(coordinator) = self.0.upgrade() {
            coordinator.on_response(env);
        }
    }
}
