//! Transport negotiation for remote MCP endpoints.
//!
//! Strategies are tried in order, first success wins: Streamable HTTP
//! (modern, bidirectional) before SSE (legacy, server-push only). Some
//! remote endpoints only implement the legacy protocol, so the probing
//! order favors the modern one without requiring caller configuration.

use rmcp::model::{ClientInfo, Implementation};
use rmcp::service::{ClientInitializeError, ServiceExt};
use rmcp::transport::sse_client::{SseClientConfig, SseClientTransport};
use rmcp::transport::streamable_http_client::{
    StreamableHttpClientTransport, StreamableHttpClientTransportConfig,
};
use strum::Display;

use crate::error::{ProxyError, Result};
use crate::options::ProxyOptions;
use crate::session::{MCPRunningService, MCPSession};

/// A transport protocol the negotiator can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TransportStrategy {
    /// Streamable HTTP (MCP 2025-03-26 and later).
    StreamableHttp,
    /// HTTP+SSE (MCP 2024-11-05).
    Sse,
}

impl TransportStrategy {
    async fn attempt(
        self,
        url: &str,
        http: &reqwest::Client,
    ) -> std::result::Result<MCPRunningService, ClientInitializeError> {
        match self {
            Self::StreamableHttp => {
                let transport = StreamableHttpClientTransport::with_client(
                    http.clone(),
                    StreamableHttpClientTransportConfig::with_uri(url.to_owned()),
                );
                client_info().into_dyn().serve(transport).await
            }
            Self::Sse => {
                let transport = SseClientTransport::start_with_client(
                    http.clone(),
                    SseClientConfig {
                        sse_endpoint: url.to_owned().into(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|error| {
                    ClientInitializeError::transport::<SseClientTransport<reqwest::Client>>(
                        error,
                        "start sse transport",
                    )
                })?;
                client_info().into_dyn().serve(transport).await
            }
        }
    }
}

/// Negotiates a handshake-complete session with a remote endpoint.
pub struct TransportNegotiator {
    strategies: Vec<TransportStrategy>,
}

impl Default for TransportNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportNegotiator {
    /// Negotiator with the default strategy order.
    pub fn new() -> Self {
        Self::with_strategies(vec![TransportStrategy::StreamableHttp, TransportStrategy::Sse])
    }

    /// Negotiator with an explicit ordered strategy list.
    pub fn with_strategies(strategies: Vec<TransportStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[TransportStrategy] {
        &self.strategies
    }

    /// Try each strategy in order; return the first session whose handshake
    /// completes. No retry, no backoff. If every strategy fails, the
    /// connection error names each attempt with its failure cause.
    pub async fn negotiate(&self, options: &ProxyOptions) -> Result<MCPSession> {
        let url = options.validated_url()?;
        let http = options.http_client()?;

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            tracing::debug!(%strategy, url = %url, "attempting MCP transport");
            match strategy.attempt(url.as_str(), &http).await {
                Ok(service) => {
                    tracing::debug!(%strategy, "MCP handshake complete");
                    return Ok(MCPSession::new(service));
                }
                Err(error) => {
                    let cause = describe_initialize_error(error);
                    tracing::debug!(%strategy, cause = %cause, "MCP transport attempt failed");
                    failures.push(format!("{strategy}: {cause}"));
                }
            }
        }

        let message = if failures.is_empty() {
            "no transport strategies configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(ProxyError::Connection {
            url: options.url.clone(),
            message,
        })
    }
}

fn client_info() -> ClientInfo {
    ClientInfo {
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn describe_initialize_error(error: ClientInitializeError) -> String {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            format!("connection closed: {context}")
        }
        ClientInitializeError::TransportError { error, context } => {
            format!("transport error ({context}): {error}")
        }
        ClientInitializeError::JsonRpcError(error) => {
            format!("JSON-RPC error {}: {}", error.code.0, error.message)
        }
        ClientInitializeError::Cancelled => "initialize cancelled".into(),
        other => format!("initialize error: {other}"),
    }
}
