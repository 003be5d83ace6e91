//! Connection options for a remote MCP endpoint.

use std::collections::HashMap;

use bon::Builder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, Result};

/// Options for connecting to a remote MCP server.
///
/// Immutable per connection attempt. Headers are forwarded verbatim on every
/// request to the endpoint (e.g. `Authorization`).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct ProxyOptions {
    /// URL of the remote MCP server (Streamable HTTP or SSE endpoint).
    #[builder(into)]
    pub url: String,
    /// Additional headers sent with every request to the MCP server.
    pub headers: Option<HashMap<String, String>>,
}

impl ProxyOptions {
    /// Create options with a URL and no extra headers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: None,
        }
    }

    /// Parse and validate the endpoint URL.
    pub fn validated_url(&self) -> Result<reqwest::Url> {
        reqwest::Url::parse(&self.url)
            .map_err(|e| ProxyError::InvalidArgument(format!("invalid endpoint URL {:?}: {e}", self.url)))
    }

    /// Convert the configured headers into a reqwest header map.
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        let Some(headers) = &self.headers else {
            return Ok(map);
        };

        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProxyError::InvalidArgument(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProxyError::InvalidArgument(format!("invalid value for header {name}: {e}")))?;
            map.insert(name, value);
        }

        Ok(map)
    }

    /// Build the HTTP client shared by every transport attempt.
    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .default_headers(self.header_map()?)
            .build()?)
    }
}
