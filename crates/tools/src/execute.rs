//! Arbitrary code execution against the active Figma tab.

use async_trait::async_trait;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};

use crate::remote::gateway;
use crate::{Tool, ToolContext, ToolSchema};

pub struct ExecuteCodeTool;

#[async_trait]
impl Tool for ExecuteCodeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_execute",
            description: "Run JavaScript against the figma Plugin API in the active tab. The snippet is wrapped in an async IIFE, so top-level await is allowed. Returned objects are serialized by value; thrown errors come back with a remediation hint when one is known.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "JavaScript to evaluate. Reference the figma global, e.g. figma.currentPage.selection"
                    }
                },
                "required": ["code"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let code = params.get("code").and_then(|v| v.as_str()).unwrap_or("");
        if code.trim().is_empty() {
            return Err(Error::Validation(
                "'code' is required and must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let code = params["code"].as_str().unwrap_or_default();

        let mut sessions = ctx.sessions.lock().await;
        let outcome = gateway::run_snippet(&mut sessions, code).await?;
        Ok(outcome.into_envelope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = ExecuteCodeTool.schema();
        assert_eq!(schema.name, "figma_execute");
        assert_eq!(schema.parameters["required"][0], "code");
    }

    #[test]
    fn test_validate() {
        let tool = ExecuteCodeTool;
        assert!(tool.validate(&json!({"code": "figma.currentPage.name"})).is_ok());
        assert!(tool.validate(&json!({"code": ""})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }
}
