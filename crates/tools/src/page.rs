//! Page-level tools: summary, navigation, coordinate clicks, accessibility
//! snapshot.

use async_trait::async_trait;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};

use crate::remote::gateway;
use crate::{safe_truncate, Tool, ToolContext, ToolSchema};

const PAGE_SUMMARY_SNIPPET: &str = r#"(async () => {
  const page = figma.currentPage;
  const counts = {};
  for (const child of page.children) {
    counts[child.type] = (counts[child.type] || 0) + 1;
  }
  return {
    file: figma.root.name,
    page: { id: page.id, name: page.name, childCount: page.children.length },
    countsByType: counts,
    selection: page.selection.map(n => ({ id: n.id, name: n.name, type: n.type })),
  };
})()"#;

pub struct PageSummaryTool;

#[async_trait]
impl Tool for PageSummaryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_page_summary",
            description: "Summarize the current Figma page: file name, page name, child counts by node type, and the current selection.",
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, _params: Value) -> Result<Value> {
        let mut sessions = ctx.sessions.lock().await;
        let outcome = gateway::run_snippet(&mut sessions, PAGE_SUMMARY_SNIPPET).await?;
        Ok(outcome.into_envelope())
    }
}

pub struct NavigateTool;

#[async_trait]
impl Tool for NavigateTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_navigate",
            description: "Navigate the active tab to a URL (e.g. another Figma document). The session reconnects lazily if the navigation replaces the page.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Destination URL (http or https)"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let url = params.get("url").and_then(|v| v.as_str()).unwrap_or("");
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Validation(
                "'url' is required and must start with http:// or https://".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let url = params["url"].as_str().unwrap_or_default();

        let mut sessions = ctx.sessions.lock().await;
        let session = sessions.ensure_active().await?;
        session
            .transport
            .call("Page.navigate", json!({"url": url}))
            .await?;

        Ok(json!({"status": "ok", "url": url}))
    }
}

pub struct ClickAtTool;

#[async_trait]
impl Tool for ClickAtTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_click_at",
            description: "Dispatch a left mouse click at viewport coordinates in the active tab. Useful for canvas interactions the Plugin API does not cover.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "x": { "type": "number", "description": "Viewport x coordinate in CSS pixels" },
                    "y": { "type": "number", "description": "Viewport y coordinate in CSS pixels" }
                },
                "required": ["x", "y"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        for key in ["x", "y"] {
            if params.get(key).and_then(|v| v.as_f64()).is_none() {
                return Err(Error::Validation(format!("'{}' is required and must be a number", key)));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let x = params["x"].as_f64().unwrap_or(0.0);
        let y = params["y"].as_f64().unwrap_or(0.0);

        let mut sessions = ctx.sessions.lock().await;
        let session = sessions.ensure_active().await?;

        for event_type in ["mousePressed", "mouseReleased"] {
            session
                .transport
                .call(
                    "Input.dispatchMouseEvent",
                    json!({
                        "type": event_type,
                        "x": x,
                        "y": y,
                        "button": "left",
                        "clickCount": 1,
                    }),
                )
                .await?;
        }

        Ok(json!({"status": "ok", "x": x, "y": y}))
    }
}

pub struct AxSnapshotTool;

#[async_trait]
impl Tool for AxSnapshotTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_ax_snapshot",
            description: "Capture the accessibility tree of the active tab. Returns role/name pairs for non-ignored nodes, truncated to max_nodes.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "max_nodes": {
                        "type": "integer",
                        "description": "Maximum nodes to return (default: 200)"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let max_nodes = params
            .get("max_nodes")
            .and_then(|v| v.as_u64())
            .unwrap_or(200) as usize;

        let mut sessions = ctx.sessions.lock().await;
        let session = sessions.ensure_active().await?;

        // The Accessibility domain is not in the always-on set; enable it on
        // demand for this one query.
        session
            .transport
            .call("Accessibility.enable", json!({}))
            .await?;
        let tree = session
            .transport
            .call("Accessibility.getFullAXTree", json!({}))
            .await?;

        let empty = Vec::new();
        let raw_nodes = tree.get("nodes").and_then(|v| v.as_array()).unwrap_or(&empty);
        let total = raw_nodes.len();

        let nodes: Vec<Value> = raw_nodes
            .iter()
            .filter(|n| n.get("ignored").and_then(|v| v.as_bool()) != Some(true))
            .filter_map(|n| {
                let role = n.pointer("/role/value").and_then(|v| v.as_str())?;
                let name = n
                    .pointer("/name/value")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                Some(json!({
                    "role": role,
                    "name": safe_truncate(name, 120),
                }))
            })
            .take(max_nodes)
            .collect();

        Ok(json!({
            "total": total,
            "returned": nodes.len(),
            "nodes": nodes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas() {
        assert_eq!(PageSummaryTool.schema().name, "figma_page_summary");
        assert_eq!(NavigateTool.schema().name, "figma_navigate");
        assert_eq!(ClickAtTool.schema().name, "figma_click_at");
        assert_eq!(AxSnapshotTool.schema().name, "figma_ax_snapshot");
    }

    #[test]
    fn test_navigate_validate() {
        let tool = NavigateTool;
        assert!(tool.validate(&json!({"url": "https://www.figma.com/design/x/Y"})).is_ok());
        assert!(tool.validate(&json!({"url": "ftp://nope"})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_click_validate() {
        let tool = ClickAtTool;
        assert!(tool.validate(&json!({"x": 10, "y": 20.5})).is_ok());
        assert!(tool.validate(&json!({"x": 10})).is_err());
        assert!(tool.validate(&json!({"x": "10", "y": 20})).is_err());
    }

    #[test]
    fn test_page_summary_snippet_is_async_iife() {
        assert!(PAGE_SUMMARY_SNIPPET.trim_start().starts_with("(async"));
        assert!(PAGE_SUMMARY_SNIPPET.contains("figma.currentPage"));
    }
}
