//! Host-side tool registry seam.
//!
//! The registry is the host capability that remote tools are surfaced
//! through (in a browser host this is `navigator.modelContext`). Its
//! presence is feature-detected at connect time via [`HostProbe`]; absence
//! is recoverable, not fatal.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::bridge::ToolDescriptor;
use crate::error::Result;
use crate::session::MCPToolCallResult;

/// Registry that descriptors are registered with, process-wide.
///
/// Duplicate names overwrite per the registry's own semantics; this crate
/// does not enforce uniqueness.
pub trait ToolRegistry: Send + Sync {
    fn register_tool(&self, descriptor: ToolDescriptor);
    fn unregister_tool(&self, name: &str);
}

/// Outcome of probing the host for a tool registry.
#[derive(Clone)]
pub enum HostCapability {
    Supported(Arc<dyn ToolRegistry>),
    Unsupported,
}

impl HostCapability {
    pub fn supported(registry: Arc<dyn ToolRegistry>) -> Self {
        Self::Supported(registry)
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }
}

impl fmt::Debug for HostCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported(_) => f.write_str("Supported"),
            Self::Unsupported => f.write_str("Unsupported"),
        }
    }
}

/// Feature-detects the host registry. Run once per connect attempt.
pub trait HostProbe: Send + Sync {
    fn probe(&self) -> HostCapability;
}

/// A fixed probe result doubles as a probe.
impl HostProbe for HostCapability {
    fn probe(&self) -> HostCapability {
        self.clone()
    }
}

/// Process-local registry backed by a name-keyed map.
///
/// The reference host registry for embedders that run the agent in the same
/// process, and the registry used throughout this crate's tests.
#[derive(Default)]
pub struct InMemoryToolRegistry {
    tools: Mutex<HashMap<String, ToolDescriptor>>,
}

impl InMemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a registered descriptor by name.
    pub fn get(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools.lock().expect("registry lock poisoned").get(name).cloned()
    }

    /// Names of all registered tools, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.tools
            .lock()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke a registered tool by name, forwarding to its remote session.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Option<Result<MCPToolCallResult>> {
        let descriptor = self.get(name)?;
        Some(descriptor.execute(arguments).await)
    }
}

impl ToolRegistry for InMemoryToolRegistry {
    fn register_tool(&self, descriptor: ToolDescriptor) {
        self.tools
            .lock()
            .expect("registry lock poisoned")
            .insert(descriptor.name().to_owned(), descriptor);
    }

    fn unregister_tool(&self, name: &str) {
        self.tools.lock().expect("registry lock poisoned").remove(name);
    }
}
