use std::collections::HashMap;
use std::sync::Arc;

use figbridge_core::{Error, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::capture::ScreenshotTool;
use crate::comments::{GetCommentsTool, PostCommentTool};
use crate::execute::ExecuteCodeTool;
use crate::history::{RedoStepsTool, UndoStepsTool};
use crate::library::{ListComponentsTool, ListStylesTool, ListTokensTool};
use crate::nodes::{DuplicateNodeTool, ExportNodeTool, FindNodesTool, InspectSelectionTool};
use crate::page::{AxSnapshotTool, ClickAtTool, NavigateTool, PageSummaryTool};
use crate::targets::{ListTargetsTool, StatusTool, SwitchTargetTool};
use crate::viewport::ZoomViewportTool;
use crate::{Tool, ToolContext};

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Target management
        registry.register(Arc::new(ListTargetsTool));
        registry.register(Arc::new(SwitchTargetTool));
        registry.register(Arc::new(StatusTool));

        // Code execution
        registry.register(Arc::new(ExecuteCodeTool));

        // Capture
        registry.register(Arc::new(ScreenshotTool));

        // Page operations
        registry.register(Arc::new(PageSummaryTool));
        registry.register(Arc::new(NavigateTool));
        registry.register(Arc::new(ClickAtTool));
        registry.register(Arc::new(AxSnapshotTool));

        // Viewport
        registry.register(Arc::new(ZoomViewportTool));

        // History
        registry.register(Arc::new(UndoStepsTool));
        registry.register(Arc::new(RedoStepsTool));

        // Nodes
        registry.register(Arc::new(FindNodesTool));
        registry.register(Arc::new(DuplicateNodeTool));
        registry.register(Arc::new(ExportNodeTool));
        registry.register(Arc::new(InspectSelectionTool));

        // Library inventory
        registry.register(Arc::new(ListComponentsTool));
        registry.register(Arc::new(ListStylesTool));
        registry.register(Arc::new(ListTokensTool));

        // REST-backed comments
        registry.register(Arc::new(GetCommentsTool));
        registry.register(Arc::new(PostCommentTool));

        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn get_tool_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                let schema = tool.schema();
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters
                    }
                })
            })
            .collect()
    }

    /// Tool descriptors in the shape the MCP `tools/list` response expects.
    pub fn mcp_tool_schemas(&self) -> Vec<Value> {
        let mut schemas: Vec<Value> = self
            .tools
            .values()
            .map(|tool| {
                let schema = tool.schema();
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "inputSchema": schema.parameters
                })
            })
            .collect();
        schemas.sort_by(|a, b| {
            a["name"]
                .as_str()
                .unwrap_or_default()
                .cmp(b["name"].as_str().unwrap_or_default())
        });
        schemas
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("figma_execute").is_none());
    }

    #[test]
    fn test_registry_with_defaults_has_catalog() {
        let reg = ToolRegistry::with_defaults();
        let names = reg.tool_names();
        assert!(names.contains(&"figma_list_targets".to_string()));
        assert!(names.contains(&"figma_switch_target".to_string()));
        assert!(names.contains(&"figma_execute".to_string()));
        assert!(names.contains(&"figma_screenshot".to_string()));
        assert!(names.contains(&"figma_export_node".to_string()));
        assert!(names.contains(&"figma_get_comments".to_string()));
        assert!(names.len() >= 21);
    }

    #[test]
    fn test_registry_get_tool_schemas() {
        let reg = ToolRegistry::with_defaults();
        let schemas = reg.get_tool_schemas();
        assert!(!schemas.is_empty());
        for schema in &schemas {
            assert_eq!(schema["type"], "function");
            assert!(schema["function"]["name"].is_string());
            assert!(schema["function"]["description"].is_string());
        }
    }

    #[test]
    fn test_registry_mcp_schemas_sorted() {
        let reg = ToolRegistry::with_defaults();
        let schemas = reg.mcp_tool_schemas();
        let names: Vec<&str> = schemas
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        for schema in &schemas {
            assert!(schema["inputSchema"]["type"].is_string());
        }
    }

    #[tokio::test]
    async fn test_registry_execute_unknown_tool() {
        let reg = ToolRegistry::with_defaults();
        let ctx = ToolContext::new(figbridge_core::Config::default(), std::env::temp_dir());
        let err = reg
            .execute("no_such_tool", ctx, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }

    #[tokio::test]
    async fn test_registry_execute_validates_params() {
        let reg = ToolRegistry::with_defaults();
        let ctx = ToolContext::new(figbridge_core::Config::default(), std::env::temp_dir());
        let err = reg
            .execute("figma_execute", ctx, json!({"code": ""}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
