//! Bridge remote MCP tools into the host tool registry.
//!
//! Pure metadata mapping plus registry side effects; no protocol logic.
//! Each descriptor's `execute` closes over the owning session and forwards
//! the invocation unchanged.

use std::fmt;
use std::sync::Arc;

use crate::error::{ProxyError, Result};
use crate::registry::HostCapability;
use crate::schema::MCPToolSchema;
use crate::session::{MCPSession, MCPToolCallResult, SessionOps};

/// A remote tool in host-registrable form.
///
/// Created at bridge time, registered once, unregistered exactly once at
/// teardown; never mutated in between.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    input_schema: serde_json::Value,
    session: Arc<dyn SessionOps>,
}

impl ToolDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &serde_json::Value {
        &self.input_schema
    }

    /// Forward an invocation to the owning session and return its result
    /// unchanged. Failures affect only this call.
    pub async fn execute(&self, arguments: serde_json::Value) -> Result<MCPToolCallResult> {
        self.session.call_tool(&self.name, arguments).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Build descriptors for every listed tool, order preserved.
///
/// Names are not de-duplicated or validated; duplicates resolve in the host
/// registry per its own semantics.
pub fn build(tools: &[MCPToolSchema], session: Arc<MCPSession>) -> Vec<ToolDescriptor> {
    build_with(tools, session)
}

pub(crate) fn build_with(
    tools: &[MCPToolSchema],
    session: Arc<dyn SessionOps>,
) -> Vec<ToolDescriptor> {
    tools
        .iter()
        .map(|tool| ToolDescriptor {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            input_schema: tool.input_schema.clone(),
            session: Arc::clone(&session),
        })
        .collect()
}

/// Register every descriptor with the host registry, in order.
///
/// An unsupported host registers nothing and reports
/// [`ProxyError::UnsupportedHost`] — a recoverable signal, not a crash.
pub fn register_all(host: &HostCapability, descriptors: &[ToolDescriptor]) -> Result<()> {
    let HostCapability::Supported(registry) = host else {
        return Err(ProxyError::UnsupportedHost);
    };

    for descriptor in descriptors {
        registry.register_tool(descriptor.clone());
    }
    Ok(())
}

/// Unregister every descriptor by name, in order, tolerating a missing host
/// registry.
pub fn unregister_all(host: &HostCapability, descriptors: &[ToolDescriptor]) {
    let HostCapability::Supported(registry) = host else {
        return;
    };

    for descriptor in descriptors {
        registry.unregister_tool(descriptor.name());
    }
}
