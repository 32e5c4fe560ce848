//! Collaboration comment tools, backed by the Figma REST API.
//!
//! These are the only operations that leave the local machine. They require
//! a personal access token and derive the document key from the active tab's
//! URL.

use async_trait::async_trait;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};

use crate::{safe_truncate, Tool, ToolContext, ToolSchema};

/// Extract the document key from a Figma URL.
pub fn file_key_from_url(url: &str) -> Option<String> {
    let re = regex::Regex::new(r"figma\.com/(?:design|file|board|slides|proto)/([A-Za-z0-9]+)")
        .ok()?;
    re.captures(url).map(|c| c[1].to_string())
}

/// Token lookup plus file-key derivation shared by both comment tools. The
/// credential check happens before any network or protocol activity.
async fn rest_preamble(ctx: &ToolContext) -> Result<(String, String)> {
    let token = ctx.config.figma_api_token().ok_or_else(|| {
        Error::MissingCredential(
            "Figma API token not configured. Set figma.apiToken in config.json or the \
             FIGMA_API_TOKEN environment variable."
                .to_string(),
        )
    })?;

    let mut sessions = ctx.sessions.lock().await;
    let session = sessions.ensure_active().await?;
    // The connect-time URL snapshot can be stale after in-tab navigation;
    // ask the page for its current location.
    let href = session
        .evaluate("window.location.href")
        .await?
        .pointer("/result/value")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| session.url.clone());
    drop(sessions);

    let file_key = file_key_from_url(&href).ok_or_else(|| {
        Error::Tool(format!(
            "Could not derive a document key from the active tab URL: {}",
            href
        ))
    })?;

    Ok((token, file_key))
}

fn comment_row(c: &Value) -> Value {
    json!({
        "id": c.get("id"),
        "message": c.get("message").and_then(|v| v.as_str()).map(|m| safe_truncate(m, 500)),
        "user": c.pointer("/user/handle"),
        "created_at": c.get("created_at"),
        "resolved_at": c.get("resolved_at"),
        "parent_id": c.get("parent_id"),
        "client_meta": c.get("client_meta"),
    })
}

pub struct GetCommentsTool;

#[async_trait]
impl Tool for GetCommentsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_get_comments",
            description: "Read the comment threads of the active document via the Figma REST API. Requires a personal access token.",
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
        let (token, file_key) = rest_preamble(&ctx).await?;

        let url = format!("{}/files/{}/comments", ctx.config.figma_api_base(), file_key);
        let resp = reqwest::Client::new()
            .get(&url)
            .header("X-Figma-Token", token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Tool(format!(
                "Figma API returned {}: {}",
                status,
                safe_truncate(&body, 300)
            )));
        }

        let body: Value = resp.json().await?;
        let comments: Vec<Value> = body
            .get("comments")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().map(comment_row).collect())
            .unwrap_or_default();

        Ok(json!({
            "file_key": file_key,
            "count": comments.len(),
            "comments": comments,
        }))
    }
}

pub struct PostCommentTool;

#[async_trait]
impl Tool for PostCommentTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_post_comment",
            description: "Post a comment on the active document via the Figma REST API, optionally anchored at canvas coordinates or as a reply to an existing thread. Requires a personal access token.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Comment text"
                    },
                    "x": { "type": "number", "description": "Canvas x anchor (with y)" },
                    "y": { "type": "number", "description": "Canvas y anchor (with x)" },
                    "comment_id": {
                        "type": "string",
                        "description": "Reply to this existing comment thread"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let message = params.get("message").and_then(|v| v.as_str()).unwrap_or("");
        if message.trim().is_empty() {
            return Err(Error::Validation(
                "'message' is required and must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let (token, file_key) = rest_preamble(&ctx).await?;

        let mut body = json!({
            "message": params["message"].as_str().unwrap_or_default(),
        });
        if let (Some(x), Some(y)) = (
            params.get("x").and_then(|v| v.as_f64()),
            params.get("y").and_then(|v| v.as_f64()),
        ) {
            body["client_meta"] = json!({"x": x, "y": y});
        }
        if let Some(reply_to) = params.get("comment_id").and_then(|v| v.as_str()) {
            body["comment_id"] = json!(reply_to);
        }

        let url = format!("{}/files/{}/comments", ctx.config.figma_api_base(), file_key);
        let resp = reqwest::Client::new()
            .post(&url)
            .header("X-Figma-Token", token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Tool(format!(
                "Figma API returned {}: {}",
                status,
                safe_truncate(&text, 300)
            )));
        }

        let created: Value = resp.json().await?;
        Ok(json!({
            "status": "ok",
            "file_key": file_key,
            "comment": comment_row(&created),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figbridge_core::Config;

    #[test]
    fn test_file_key_extraction() {
        assert_eq!(
            file_key_from_url("https://www.figma.com/design/aBc123/My-File?node-id=1-2"),
            Some("aBc123".to_string())
        );
        assert_eq!(
            file_key_from_url("https://www.figma.com/file/XyZ/Older"),
            Some("XyZ".to_string())
        );
        assert_eq!(
            file_key_from_url("https://www.figma.com/board/Q9/Jam"),
            Some("Q9".to_string())
        );
        assert_eq!(file_key_from_url("https://example.com/design/abc"), None);
        assert_eq!(file_key_from_url("https://www.figma.com/files/recent"), None);
    }

    #[test]
    fn test_post_validate() {
        let tool = PostCommentTool;
        assert!(tool.validate(&json!({"message": "hi"})).is_ok());
        assert!(tool.validate(&json!({"message": " "})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_any_network() {
        // Default config carries no token; the tool must fail immediately
        // without touching the session registry or the network.
        let ctx = crate::ToolContext::new(Config::default(), std::env::temp_dir());
        let err = GetCommentsTool
            .execute(ctx, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
    }
}
