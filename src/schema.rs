//! Tool metadata exposed by a remote MCP server.

use serde::{Deserialize, Serialize};

/// Schema for a tool exposed by an MCP server.
///
/// Read-only to this crate: produced by the remote endpoint during
/// `tools/list` and forwarded unchanged to the host registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MCPToolSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_wire_shape_with_optional_description() {
        let schema: MCPToolSchema = serde_json::from_value(json!({
            "name": "search",
            "inputSchema": { "type": "object" }
        }))
        .expect("tool schema should deserialize");

        assert_eq!(schema.name, "search");
        assert_eq!(schema.description, None);
        assert_eq!(schema.input_schema["type"], "object");
    }
}
