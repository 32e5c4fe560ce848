//! Viewport control for the active Figma tab.

use async_trait::async_trait;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};

use crate::remote::gateway;
use crate::{Tool, ToolContext, ToolSchema};

/// Build the viewport snippet from the requested adjustments.
fn zoom_snippet(zoom: Option<f64>, center: Option<(f64, f64)>, node_id: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(id) = node_id {
        let id_js = serde_json::to_string(id).unwrap_or_else(|_| "null".to_string());
        body.push_str(&format!(
            "const node = await figma.getNodeByIdAsync({id});\n\
             if (!node) throw new Error('No node with id ' + {id});\n\
             figma.viewport.scrollAndZoomIntoView([node]);\n",
            id = id_js
        ));
    }
    if let Some(z) = zoom {
        body.push_str(&format!("figma.viewport.zoom = {};\n", z));
    }
    if let Some((x, y)) = center {
        body.push_str(&format!("figma.viewport.center = {{ x: {}, y: {} }};\n", x, y));
    }
    body.push_str("return { zoom: figma.viewport.zoom, center: figma.viewport.center };");
    format!("(async () => {{\n{}\n}})()", body)
}

pub struct ZoomViewportTool;

#[async_trait]
impl Tool for ZoomViewportTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_zoom_viewport",
            description: "Adjust the Figma canvas viewport: set an absolute zoom level, recenter on coordinates, or scroll a node into view. Returns the resulting zoom and center.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "zoom": {
                        "type": "number",
                        "description": "Absolute zoom level (1 = 100%)"
                    },
                    "center_x": { "type": "number", "description": "Canvas x to center on" },
                    "center_y": { "type": "number", "description": "Canvas y to center on" },
                    "node_id": {
                        "type": "string",
                        "description": "Scroll and zoom this node into view before applying zoom/center"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let has_zoom = params.get("zoom").and_then(|v| v.as_f64()).is_some();
        let has_center = params.get("center_x").and_then(|v| v.as_f64()).is_some()
            && params.get("center_y").and_then(|v| v.as_f64()).is_some();
        let has_node = params.get("node_id").and_then(|v| v.as_str()).is_some();
        if !has_zoom && !has_center && !has_node {
            return Err(Error::Validation(
                "Provide at least one of 'zoom', 'center_x'+'center_y', or 'node_id'".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let zoom = params.get("zoom").and_then(|v| v.as_f64());
        let center = match (
            params.get("center_x").and_then(|v| v.as_f64()),
            params.get("center_y").and_then(|v| v.as_f64()),
        ) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };
        let node_id = params.get("node_id").and_then(|v| v.as_str());

        let snippet = zoom_snippet(zoom, center, node_id);
        let mut sessions = ctx.sessions.lock().await;
        let outcome = gateway::run_snippet(&mut sessions, &snippet).await?;
        Ok(outcome.into_envelope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_and_validate() {
        let tool = ZoomViewportTool;
        assert_eq!(tool.schema().name, "figma_zoom_viewport");
        assert!(tool.validate(&json!({"zoom": 0.5})).is_ok());
        assert!(tool.validate(&json!({"center_x": 1, "center_y": 2})).is_ok());
        assert!(tool.validate(&json!({"node_id": "1:2"})).is_ok());
        assert!(tool.validate(&json!({"center_x": 1})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_zoom_snippet_contents() {
        let s = zoom_snippet(Some(2.0), Some((10.0, 20.0)), Some("1:2"));
        assert!(s.contains("figma.viewport.zoom = 2"));
        assert!(s.contains("center = { x: 10, y: 20 }"));
        assert!(s.contains("getNodeByIdAsync(\"1:2\")"));
        assert!(s.starts_with("(async"));
    }

    #[test]
    fn test_zoom_snippet_zoom_only() {
        let s = zoom_snippet(Some(1.0), None, None);
        assert!(s.contains("figma.viewport.zoom = 1"));
        assert!(!s.contains("getNodeByIdAsync"));
        assert!(!s.contains("figma.viewport.center ="));
    }
}
