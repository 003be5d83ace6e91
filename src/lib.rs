//! webmcp-proxy — bridge remote MCP servers to a host tool registry.
//!
//! Connects to a remote MCP server (Streamable HTTP with SSE fallback),
//! discovers its tools, and registers them with the embedding host's tool
//! registry so an in-page agent can invoke them as native capabilities.
//! Reconnects are last-URL-wins: an overlapping connect supersedes the
//! older attempt, which cleans up after itself instead of registering.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use webmcp_proxy::prelude::*;
//!
//! # async fn example() -> webmcp_proxy::error::Result<()> {
//! let registry = Arc::new(InMemoryToolRegistry::new());
//! let manager = ProxyManager::new(Arc::new(HostCapability::supported(registry.clone())));
//!
//! let instance = manager
//!     .connect(ProxyOptions::new("https://mcp.example.com/mcp"))
//!     .await?;
//! println!("registered {} remote tools", instance.tools().len());
//!
//! instance.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;
pub mod observer;
pub mod options;
pub mod prelude;
pub mod proxy;
pub mod registry;
pub mod schema;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
