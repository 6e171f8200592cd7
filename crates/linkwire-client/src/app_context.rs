//! Process-wide client context.
//!
//! Built once at startup and handed to every consumer. Holds exactly one
//! dispatcher, one connection manager and one auth coordinator.

use std::sync::Arc;

use tokio::runtime::Handle;

use linkwire_core::error::{LinkError, Result};

use crate::auth::AuthCoordinator;
use crate::config::{ClientConfig, ClientSettings};
use crate::connection::ConnectionManager;
use crate::dispatch::Dispatcher;
use crate::transport::{Connector, WsConnector};

#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    cfg: ClientConfig,
    settings: ClientSettings,
    manager: ConnectionManager,
    auth: Arc<AuthCoordinator>,
}

impl AppContext {
    /// Build the context with the WebSocket transport.
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let runtime = current_runtime()?;
        let connector = Arc::new(WsConnector::new(&cfg.settings(), runtime.clone()));
        Ok(Self::build(cfg, connector, &runtime))
    }

    /// Build the context over a caller-supplied transport.
    pub fn with_connector(cfg: ClientConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let runtime = current_runtime()?;
        Ok(Self::build(cfg, connector, &runtime))
    }

    fn build(cfg: ClientConfig, connector: Arc<dyn Connector>, runtime: &Handle) -> Self {
        let settings = cfg.settings();
        let dispatcher = Dispatcher::new(runtime);
        let manager = ConnectionManager::new(&settings, connector, dispatcher, runtime);
        let auth = AuthCoordinator::new(manager.clone(), settings.auth_success_markers.clone());

        Self {
            inner: Arc::new(AppContextInner {
                cfg,
                settings,
                manager,
                auth,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.cfg
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.inner.manager
    }

    pub fn auth(&self) -> &AuthCoordinator {
        &self.inner.auth
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.inner.manager.dispatcher()
    }

    /// Connect to `serverUrl` from the config.
    pub fn connect_default(&self) -> Result<()> {
        let url = self
            .inner
            .cfg
            .server_url
            .as_deref()
            .ok_or_else(|| LinkError::BadRequest("serverUrl is not configured".into()))?;
        self.inner.manager.connect(url);
        Ok(())
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current()
        .map_err(|e| LinkError::Internal(format!("no tokio runtime: {e}")))
}
