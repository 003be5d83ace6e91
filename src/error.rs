//! Error types for webmcp-proxy.

use thiserror::Error;

/// Primary error type for all proxy operations.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Every transport strategy failed to establish a session.
    #[error("Connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    /// The endpoint was reachable but returned a malformed or erroring
    /// response to a listing or invocation request.
    #[error("Protocol error during {operation}: {message}")]
    Protocol { operation: String, message: String },

    /// The host exposes no tool registry. Recoverable: callers degrade to an
    /// empty tool set instead of failing.
    #[error("Host tool registry is unavailable")]
    UnsupportedHost,

    /// The remote tool ran and reported failure.
    #[error("Tool execution error: {tool_name} — {message}")]
    ToolExecution { tool_name: String, message: String },

    /// A newer connect attempt took ownership before this one completed.
    #[error("Connection attempt superseded by a newer endpoint")]
    Superseded,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProxyError {
    /// Create a protocol error scoped to one operation.
    pub fn protocol(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the error leaves the caller free to keep using the session.
    ///
    /// Invocation-scoped failures affect only the tool call that triggered
    /// them; connection- and listing-level failures abort the connect.
    pub fn is_invocation_scoped(&self) -> bool {
        matches!(self, Self::ToolExecution { .. } | Self::InvalidArgument(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ProxyError>;
