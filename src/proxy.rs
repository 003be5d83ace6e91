//! Connection lifecycle management.
//!
//! `ProxyManager` orchestrates connect → bridge → ready and
//! disconnect → unbridge → close. Overlapping connects are resolved with a
//! generation token: every attempt snapshots the counter at entry, and any
//! attempt whose token is stale at a resume point cleans up after itself
//! instead of registering. Registration is last-URL-wins, not
//! last-to-finish-wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::Mutex;

use crate::bridge::{self, ToolDescriptor};
use crate::error::{ProxyError, Result};
use crate::options::ProxyOptions;
use crate::registry::{HostCapability, HostProbe};
use crate::schema::MCPToolSchema;
use crate::session::SessionOps;
use crate::transport::TransportNegotiator;

/// Connection status, as observed through a wrapper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProxyStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Negotiation seam between the manager and the transport layer.
#[async_trait]
pub(crate) trait NegotiateOps: Send + Sync {
    async fn negotiate(&self, options: &ProxyOptions) -> Result<Arc<dyn SessionOps>>;
}

#[async_trait]
impl NegotiateOps for TransportNegotiator {
    async fn negotiate(&self, options: &ProxyOptions) -> Result<Arc<dyn SessionOps>> {
        let session = TransportNegotiator::negotiate(self, options).await?;
        Ok(Arc::new(session))
    }
}

struct Teardown {
    host: HostCapability,
    descriptors: Vec<ToolDescriptor>,
    session: Arc<dyn SessionOps>,
}

/// One successful connection to a remote endpoint.
///
/// Not reusable after disconnect; a fresh connect produces a new instance.
#[derive(Clone)]
pub struct ProxyInstance {
    tools: Arc<Vec<MCPToolSchema>>,
    teardown: Arc<Mutex<Option<Teardown>>>,
}

impl ProxyInstance {
    fn connected(
        tools: Vec<MCPToolSchema>,
        host: HostCapability,
        descriptors: Vec<ToolDescriptor>,
        session: Arc<dyn SessionOps>,
    ) -> Self {
        Self {
            tools: Arc::new(tools),
            teardown: Arc::new(Mutex::new(Some(Teardown {
                host,
                descriptors,
                session,
            }))),
        }
    }

    /// Instance for hosts without a tool registry: no tools, no-op
    /// disconnect.
    fn detached() -> Self {
        Self {
            tools: Arc::new(Vec::new()),
            teardown: Arc::new(Mutex::new(None)),
        }
    }

    /// Remote tools discovered and registered for this connection, in
    /// listed order.
    pub fn tools(&self) -> &[MCPToolSchema] {
        &self.tools
    }

    /// Whether disconnect has already released this instance.
    pub async fn is_disconnected(&self) -> bool {
        self.teardown.lock().await.is_none()
    }

    /// Unregister every descriptor, then close the session.
    ///
    /// Idempotent: the first call tears down, every later call is a no-op.
    pub async fn disconnect(&self) -> Result<()> {
        let Some(teardown) = self.teardown.lock().await.take() else {
            return Ok(());
        };

        bridge::unregister_all(&teardown.host, &teardown.descriptors);
        teardown.session.close().await
    }
}

/// Orchestrates the connection lifecycle against one host registry.
pub struct ProxyManager {
    probe: Arc<dyn HostProbe>,
    negotiator: Box<dyn NegotiateOps>,
    generation: AtomicU64,
    active: Mutex<Option<ProxyInstance>>,
}

impl ProxyManager {
    /// Manager with the default transport negotiation order.
    pub fn new(probe: Arc<dyn HostProbe>) -> Self {
        Self::with_negotiator(probe, TransportNegotiator::new())
    }

    /// Manager with an explicit transport negotiator.
    pub fn with_negotiator(probe: Arc<dyn HostProbe>, negotiator: TransportNegotiator) -> Self {
        Self::from_parts(probe, Box::new(negotiator))
    }

    pub(crate) fn from_parts(probe: Arc<dyn HostProbe>, negotiator: Box<dyn NegotiateOps>) -> Self {
        Self {
            probe,
            negotiator,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Connect to the endpoint and register its tools with the host.
    ///
    /// Supersedes any earlier attempt, completed or in flight: a completed
    /// one is disconnected now, an in-flight one finds its token stale when
    /// it resumes and cleans up after itself with [`ProxyError::Superseded`].
    /// On a host without a registry this degrades to a detached instance
    /// without contacting the endpoint.
    pub async fn connect(&self, options: ProxyOptions) -> Result<ProxyInstance> {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(previous) = self.active.lock().await.take() {
            if let Err(error) = previous.disconnect().await {
                tracing::warn!(error = %error, "superseded connection did not close cleanly");
            }
        }

        let host = self.probe.probe();
        if !host.is_supported() {
            tracing::warn!(
                url = %options.url,
                "host tool registry unavailable; remote tools will not be registered"
            );
            return Ok(ProxyInstance::detached());
        }

        let session = self.negotiator.negotiate(&options).await?;
        if self.is_superseded(token) {
            return self.abandon(session).await;
        }

        let tools = match session.list_tools().await {
            Ok(tools) => tools,
            Err(error) => {
                let _ = session.close().await;
                return Err(error);
            }
        };
        if self.is_superseded(token) {
            return self.abandon(session).await;
        }

        let descriptors = bridge::build_with(&tools, Arc::clone(&session));

        // Registration never suspends, so holding the activation slot across
        // the token re-check makes publication atomic.
        let mut active = self.active.lock().await;
        if self.is_superseded(token) {
            drop(active);
            return self.abandon(session).await;
        }
        bridge::register_all(&host, &descriptors)?;
        let instance = ProxyInstance::connected(tools, host, descriptors, session);
        *active = Some(instance.clone());

        tracing::debug!(url = %options.url, tools = instance.tools().len(), "proxy connected");
        Ok(instance)
    }

    /// Disconnect the active instance and invalidate in-flight attempts.
    pub async fn disconnect(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match self.active.lock().await.take() {
            Some(active) => active.disconnect().await,
            None => Ok(()),
        }
    }

    async fn abandon(&self, session: Arc<dyn SessionOps>) -> Result<ProxyInstance> {
        if let Err(error) = session.close().await {
            tracing::warn!(error = %error, "superseded attempt did not close cleanly");
        }
        Err(ProxyError::Superseded)
    }

    fn is_superseded(&self, token: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != token
    }
}
