//! Screenshot capture of the active Figma tab.

use async_trait::async_trait;
use base64::Engine;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Tool, ToolContext, ToolSchema};

pub struct ScreenshotTool;

#[async_trait]
impl Tool for ScreenshotTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_screenshot",
            description: "Capture the visible viewport of the active Figma tab as an image file. Returns the written path and the viewport pixel dimensions.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "output_path": {
                        "type": "string",
                        "description": "File path for the image (default: a timestamped file under the workspace media dir)"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["png", "jpeg"],
                        "description": "Image format (default: png)"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if let Some(format) = params.get("format").and_then(|v| v.as_str()) {
            if !matches!(format, "png" | "jpeg") {
                return Err(Error::Validation(format!(
                    "Invalid format '{}'. Valid: png, jpeg",
                    format
                )));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let format = params
            .get("format")
            .and_then(|v| v.as_str())
            .unwrap_or("png");

        let mut sessions = ctx.sessions.lock().await;
        let session = sessions.ensure_active().await?;

        let result = session
            .transport
            .call("Page.captureScreenshot", json!({"format": format}))
            .await?;
        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("No screenshot data returned".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| Error::Tool(format!("Screenshot payload was not valid base64: {}", e)))?;

        // Viewport pixel dimensions come from a separate scripted query.
        let dims = session
            .evaluate("({ width: window.innerWidth, height: window.innerHeight })")
            .await?;
        let width = dims.pointer("/result/value/width").cloned().unwrap_or(Value::Null);
        let height = dims.pointer("/result/value/height").cloned().unwrap_or(Value::Null);
        drop(sessions);

        let path = match params.get("output_path").and_then(|v| v.as_str()) {
            Some(p) => std::path::PathBuf::from(p),
            None => {
                let stamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                ctx.workspace
                    .join("media")
                    .join(format!("figma_{}.{}", stamp, format))
            }
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &bytes)?;

        Ok(json!({
            "status": "ok",
            "path": path.display().to_string(),
            "bytes": bytes.len(),
            "width": width,
            "height": height,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = ScreenshotTool.schema();
        assert_eq!(schema.name, "figma_screenshot");
    }

    #[test]
    fn test_validate_format() {
        let tool = ScreenshotTool;
        assert!(tool.validate(&json!({})).is_ok());
        assert!(tool.validate(&json!({"format": "png"})).is_ok());
        assert!(tool.validate(&json!({"format": "bmp"})).is_err());
    }
}
