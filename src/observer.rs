//! Reactive wrapper over the lifecycle manager.
//!
//! `ProxyObserver` is the embedding-framework surface: it drives the
//! manager on endpoint changes and publishes status, tools, and the last
//! error through watch channels. It never panics and never returns an
//! error from its lifecycle methods; failures land in the published state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ProxyError;
use crate::options::ProxyOptions;
use crate::proxy::{ProxyManager, ProxyStatus};
use crate::registry::HostProbe;
use crate::schema::MCPToolSchema;

pub struct ProxyObserver {
    manager: Arc<ProxyManager>,
    epoch: AtomicU64,
    status_tx: watch::Sender<ProxyStatus>,
    tools_tx: watch::Sender<Vec<MCPToolSchema>>,
    error_tx: watch::Sender<Option<Arc<ProxyError>>>,
}

impl ProxyObserver {
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self::with_manager(Arc::new(ProxyManager::new(probe)))
    }

    pub fn with_manager(manager: Arc<ProxyManager>) -> Self {
        Self {
            manager,
            epoch: AtomicU64::new(0),
            status_tx: watch::Sender::new(ProxyStatus::Disconnected),
            tools_tx: watch::Sender::new(Vec::new()),
            error_tx: watch::Sender::new(None),
        }
    }

    pub fn manager(&self) -> &Arc<ProxyManager> {
        &self.manager
    }

    /// Reactive connection status, updated on every lifecycle transition.
    pub fn status(&self) -> watch::Receiver<ProxyStatus> {
        self.status_tx.subscribe()
    }

    /// Reactive list of tools registered for the current connection.
    pub fn tools(&self) -> watch::Receiver<Vec<MCPToolSchema>> {
        self.tools_tx.subscribe()
    }

    /// Reactive last connection error, cleared when a new attempt starts.
    pub fn last_error(&self) -> watch::Receiver<Option<Arc<ProxyError>>> {
        self.error_tx.subscribe()
    }

    /// Connect to a new endpoint, superseding any previous one.
    ///
    /// A stale attempt's completion never touches state published by a
    /// newer call.
    pub async fn set_endpoint(&self, options: ProxyOptions) {
        let epoch = self.bump_epoch();
        self.status_tx.send_replace(ProxyStatus::Connecting);
        self.error_tx.send_replace(None);

        match self.manager.connect(options).await {
            Ok(instance) => {
                if self.is_stale(epoch) {
                    return;
                }
                self.tools_tx.send_replace(instance.tools().to_vec());
                self.status_tx.send_replace(ProxyStatus::Connected);
            }
            // A newer set_endpoint owns the published state.
            Err(ProxyError::Superseded) => {}
            Err(error) => {
                if self.is_stale(epoch) {
                    return;
                }
                self.error_tx.send_replace(Some(Arc::new(error)));
                self.status_tx.send_replace(ProxyStatus::Error);
            }
        }
    }

    /// Disconnect and return to the disconnected state.
    pub async fn clear_endpoint(&self) {
        let epoch = self.bump_epoch();
        if let Err(error) = self.manager.disconnect().await {
            tracing::warn!(error = %error, "disconnect did not complete cleanly");
        }
        if self.is_stale(epoch) {
            return;
        }
        self.tools_tx.send_replace(Vec::new());
        self.error_tx.send_replace(None);
        self.status_tx.send_replace(ProxyStatus::Disconnected);
    }

    fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }
}
