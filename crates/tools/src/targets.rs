//! Target management tools: list open Figma tabs, switch the active one,
//! report connection health.

use async_trait::async_trait;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};

use crate::{Tool, ToolContext, ToolSchema};

pub struct ListTargetsTool;

#[async_trait]
impl Tool for ListTargetsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_list_targets",
            description: "List the Figma tabs currently reachable through the local debugging endpoint, with their connection state and which one is active.",
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
        let listing = sessions.list().await;

        let targets: Vec<Value> = listing
            .iter()
            .map(|t| {
                json!({
                    "id": t.descriptor.id,
                    "title": t.descriptor.title,
                    "url": t.descriptor.url,
                    "connected": t.connected,
                    "active": t.active,
                })
            })
            .collect();

        Ok(json!({
            "count": targets.len(),
            "targets": targets,
        }))
    }
}

pub struct SwitchTargetTool;

#[async_trait]
impl Tool for SwitchTargetTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_switch_target",
            description: "Make another Figma tab the active target for all subsequent operations. The identifier can be a tab id, a title substring, a URL substring, or a 1-based index into the current listing.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "description": "Tab id, title substring, URL substring, or 1-based index"
                    }
                },
                "required": ["target"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let target = params.get("target").and_then(|v| v.as_str()).unwrap_or("");
        if target.trim().is_empty() {
            return Err(Error::Validation(
                "'target' is required and must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let target = params["target"].as_str().unwrap_or_default();

        let mut sessions = ctx.sessions.lock().await;
        let session = sessions.switch_to(target).await?;

        Ok(json!({
            "status": "ok",
            "active": {
                "id": session.id,
                "title": session.title,
                "url": session.url,
            }
        }))
    }
}

pub struct StatusTool;

#[async_trait]
impl Tool for StatusTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_status",
            description: "Report whether a live connection to a Figma tab exists and which tab it is. Probes the active connection without side effects.",
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
        match sessions.active_session() {
            Some(session) => {
                let live = session.probe().await;
                Ok(json!({
                    "connected": live,
                    "id": session.id,
                    "title": session.title,
                    "url": session.url,
                }))
            }
            None => Ok(json!({
                "connected": false,
                "message": "No active Figma tab. Any operation will auto-connect, or use figma_switch_target.",
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas() {
        assert_eq!(ListTargetsTool.schema().name, "figma_list_targets");
        assert_eq!(SwitchTargetTool.schema().name, "figma_switch_target");
        assert_eq!(StatusTool.schema().name, "figma_status");
    }

    #[test]
    fn test_switch_validate() {
        let tool = SwitchTargetTool;
        assert!(tool.validate(&json!({"target": "dash"})).is_ok());
        assert!(tool.validate(&json!({"target": "  "})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }
}
