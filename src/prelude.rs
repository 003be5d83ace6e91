//! Convenience re-exports for common use.

pub use crate::bridge::ToolDescriptor;
pub use crate::error::{ProxyError, Result};
pub use crate::observer::ProxyObserver;
pub use crate::options::ProxyOptions;
pub use crate::proxy::{ProxyInstance, ProxyManager, ProxyStatus};
pub use crate::registry::{HostCapability, HostProbe, InMemoryToolRegistry, ToolRegistry};
pub use crate::schema::MCPToolSchema;
pub use crate::session::{MCPSession, MCPToolCallResult};
pub use crate::transport::{TransportNegotiator, TransportStrategy};
