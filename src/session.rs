//! Session proxy over one negotiated MCP connection.

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, CallToolResult, Content, JsonObject, ResourceContents},
    service::{DynService, RoleClient, RunningService, ServiceError},
};
use tokio::sync::Mutex;

use crate::error::{ProxyError, Result};
use crate::schema::MCPToolSchema;

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// Result of one remote tool invocation, surfaced unchanged to the caller.
#[derive(Debug, Clone)]
pub struct MCPToolCallResult {
    pub structured_content: Option<serde_json::Value>,
    pub text_content: Option<String>,
    pub content: Vec<serde_json::Value>,
}

impl MCPToolCallResult {
    pub fn into_value_or_text(self) -> serde_json::Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        if let Some(text) = self.text_content {
            return serde_json::Value::String(text);
        }
        serde_json::Value::Array(self.content)
    }
}

/// Operations a capability bridge needs from a live session.
///
/// Implemented by [`MCPSession`]; mocked in unit tests.
#[async_trait]
pub(crate) trait SessionOps: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>>;
    async fn call_tool(&self, name: &str, arguments: serde_json::Value)
        -> Result<MCPToolCallResult>;
    async fn close(&self) -> Result<()>;
}

/// Proxy for one negotiated connection to a remote MCP server.
///
/// Wraps the handshake-complete rmcp service produced by transport
/// negotiation. `close` is idempotent; any call after close fails with a
/// protocol error rather than panicking.
pub struct MCPSession {
    service: Mutex<Option<MCPRunningService>>,
}

impl MCPSession {
    pub(crate) fn new(service: MCPRunningService) -> Self {
        Self {
            service: Mutex::new(Some(service)),
        }
    }

    /// List available tools from the MCP server.
    pub async fn list_tools(&self) -> Result<Vec<MCPToolSchema>> {
        let guard = self.service.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| closed_error("tools/list"))?;

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                // Some servers reject paginated listing; fall back to one page.
                let page = session
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("tools/list", e))?;
                page.tools
            }
            Err(e) => return Err(map_service_error("tools/list", e)),
        };

        Ok(tools.into_iter().map(map_tool_schema).collect())
    }

    /// Invoke a tool on the MCP server, forwarding arguments verbatim.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult> {
        let arguments = coerce_tool_arguments(arguments)?;
        let guard = self.service.lock().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| closed_error("tools/call"))?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| map_service_error("tools/call", e))?;

        map_call_result(name, result)
    }

    /// Release the transport. Safe to call any number of times.
    pub async fn close(&self) -> Result<()> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = service.cancel().await {
            tracing::warn!(error = %e, "MCP session shutdown did not complete cleanly");
        }
        Ok(())
    }

    /// Whether `close` has already run.
    pub async fn is_closed(&self) -> bool {
        self.service.lock().await.is_none()
    }
}

#[async_trait]
impl SessionOps for MCPSession {
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>> {
        MCPSession::list_tools(self).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult> {
        MCPSession::call_tool(self, name, arguments).await
    }

    async fn close(&self) -> Result<()> {
        MCPSession::close(self).await
    }
}

fn closed_error(operation: &str) -> ProxyError {
    ProxyError::protocol(operation, "MCP session is closed")
}

fn map_tool_schema(tool: rmcp::model::Tool) -> MCPToolSchema {
    MCPToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
    }
}

fn coerce_tool_arguments(value: serde_json::Value) -> Result<Option<JsonObject>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                ProxyError::InvalidArgument(format!("tool arguments must be valid JSON: {e}"))
            })?;
            coerce_tool_arguments(parsed)
        }
        other => Err(ProxyError::InvalidArgument(format!(
            "tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<MCPToolCallResult> {
    let text_content = extract_text_content(&result.content);
    let content = result
        .content
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect::<Vec<_>>();

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or_else(|| text_content.clone())
            .unwrap_or_else(|| "MCP tool returned an error result".into());

        return Err(ProxyError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    Ok(MCPToolCallResult {
        structured_content: result.structured_content,
        text_content,
        content,
    })
}

fn map_service_error(operation: &str, error: ServiceError) -> ProxyError {
    match error {
        ServiceError::McpError(error) => ProxyError::protocol(
            operation,
            format!("MCP error {}: {}", error.code.0, error.message),
        ),
        ServiceError::TransportSend(error) => {
            ProxyError::protocol(operation, format!("transport send failed: {error}"))
        }
        ServiceError::TransportClosed => ProxyError::protocol(operation, "transport closed"),
        ServiceError::UnexpectedResponse => {
            ProxyError::protocol(operation, "unexpected MCP response")
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            ProxyError::protocol(operation, format!("request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => ProxyError::Timeout(timeout.as_millis() as u64),
        other => ProxyError::protocol(operation, format!("MCP service error: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn coerce_tool_arguments_accepts_object_and_stringified_object() {
        let from_obj = coerce_tool_arguments(json!({"q":"x"}))
            .expect("object arguments should parse")
            .expect("object should be present");
        assert_eq!(from_obj.get("q"), Some(&json!("x")));

        let from_str = coerce_tool_arguments(json!(r#"{"q":"y"}"#))
            .expect("stringified object should parse")
            .expect("object should be present");
        assert_eq!(from_str.get("q"), Some(&json!("y")));
    }

    #[test]
    fn coerce_tool_arguments_passes_null_and_empty_string_as_none() {
        assert!(coerce_tool_arguments(serde_json::Value::Null)
            .expect("null should coerce")
            .is_none());
        assert!(coerce_tool_arguments(json!("  "))
            .expect("blank string should coerce")
            .is_none());
    }

    #[test]
    fn coerce_tool_arguments_rejects_non_object() {
        let err =
            coerce_tool_arguments(json!(["bad"])).expect_err("array arguments should be rejected");
        assert!(matches!(err, ProxyError::InvalidArgument(_)));
    }

    #[test]
    fn map_tool_schema_copies_fields() {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), json!("object"));
        let tool = rmcp::model::Tool::new("weather", "lookup weather", schema);

        let mapped = map_tool_schema(tool);
        assert_eq!(mapped.name, "weather");
        assert_eq!(mapped.description.as_deref(), Some("lookup weather"));
        assert_eq!(mapped.input_schema["type"], "object");
    }

    #[test]
    fn map_call_result_surfaces_error_payload_as_tool_execution_error() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "tool failed at runtime" }
            ],
            "structuredContent": {
                "code": "TOOL_FAILURE"
            },
            "isError": true
        }))
        .expect("fixture call result should deserialize");

        let err = map_call_result("search_docs", result)
            .expect_err("error result should map to tool execution error");
        assert!(matches!(
            err,
            ProxyError::ToolExecution { tool_name, message }
            if tool_name == "search_docs" && message.contains("TOOL_FAILURE")
        ));
    }

    #[test]
    fn map_call_result_keeps_structured_and_text_content() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "two results" }
            ],
            "structuredContent": { "hits": 2 },
            "isError": false
        }))
        .expect("fixture call result should deserialize");

        let mapped = map_call_result("search", result).expect("success result should map");
        assert_eq!(mapped.structured_content, Some(json!({ "hits": 2 })));
        assert_eq!(mapped.text_content.as_deref(), Some("two results"));
        assert_eq!(mapped.clone().into_value_or_text(), json!({ "hits": 2 }));
    }

    #[test]
    fn map_service_error_protocol_violation_maps_to_protocol_error() {
        let err = map_service_error("tools/list", ServiceError::UnexpectedResponse);
        assert!(matches!(
            err,
            ProxyError::Protocol { operation, message }
            if operation == "tools/list" && message.contains("unexpected MCP response")
        ));
    }

    #[test]
    fn map_service_error_timeout_maps_to_timeout_error() {
        let err = map_service_error(
            "tools/call",
            ServiceError::Timeout {
                timeout: Duration::from_millis(2750),
            },
        );
        assert!(matches!(err, ProxyError::Timeout(2750)));
    }

    #[test]
    fn map_service_error_cancelled_reason_is_preserved() {
        let err = map_service_error(
            "tools/call",
            ServiceError::Cancelled {
                reason: Some("client cancelled".into()),
            },
        );
        assert!(matches!(
            err,
            ProxyError::Protocol { message, .. } if message.contains("client cancelled")
        ));
    }
}
