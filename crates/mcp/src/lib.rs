//! MCP (Model Context Protocol) server plumbing: JSON-RPC 2.0 over stdio.
//!
//! The crate is protocol-only; the host binary supplies the tool catalog and
//! dispatch through the [`ToolHandler`] trait.

pub mod protocol;
pub mod server;

use serde::Serialize;
use serde_json::Value;

pub use server::{McpServer, ToolHandler};

/// One content block of a tool call result.
#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Result envelope for `tools/call`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: true,
        }
    }

    /// Pretty-print a JSON value as the single text block.
    pub fn json(value: &Value) -> Self {
        Self::text(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_serialization() {
        let result = ToolResult::text("hello");
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["content"][0]["type"], "text");
        assert_eq!(v["content"][0]["text"], "hello");
        assert_eq!(v["isError"], false);
    }

    #[test]
    fn test_tool_result_error_flag() {
        let result = ToolResult::error("boom");
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["isError"], true);
    }

    #[test]
    fn test_tool_result_json_pretty_prints() {
        let result = ToolResult::json(&json!({"a": 1}));
        assert!(result.content[0].text.contains("\"a\": 1"));
    }
}
