//! Node-level tools: find/select, duplicate, export, deep inspection.

use async_trait::async_trait;
use base64::Engine;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::remote::gateway;
use crate::{Tool, ToolContext, ToolSchema};

/// Embed a Rust string as a JS string literal (or `null`).
fn js_string(s: Option<&str>) -> String {
    match s {
        Some(s) => serde_json::to_string(s).unwrap_or_else(|_| "null".to_string()),
        None => "null".to_string(),
    }
}

/// Expression that resolves the operation's target node: explicit id, else
/// first selected node.
fn target_node_expr(node_id: Option<&str>) -> String {
    match node_id {
        Some(id) => format!("await figma.getNodeByIdAsync({})", js_string(Some(id))),
        None => "figma.currentPage.selection[0]".to_string(),
    }
}

fn find_nodes_snippet(
    query: Option<&str>,
    node_type: Option<&str>,
    select: bool,
    limit: u64,
) -> String {
    format!(
        r#"(async () => {{
  const q = {query};
  const type = {node_type};
  const matches = figma.currentPage.findAll(n => {{
    const nameOk = q === null || n.name.toLowerCase().includes(q.toLowerCase());
    const typeOk = type === null || n.type === type;
    return nameOk && typeOk;
  }}).slice(0, {limit});
  if ({select} && matches.length > 0) {{
    figma.currentPage.selection = matches;
    figma.viewport.scrollAndZoomIntoView(matches);
  }}
  return {{
    count: matches.length,
    nodes: matches.map(n => ({{ id: n.id, name: n.name, type: n.type }})),
  }};
}})()"#,
        query = js_string(query),
        node_type = js_string(node_type),
        select = select,
        limit = limit,
    )
}

fn duplicate_snippet(node_id: Option<&str>, offset_x: f64, offset_y: f64) -> String {
    format!(
        r#"(async () => {{
  const node = {target};
  if (!node) throw new Error("No node to duplicate; pass node_id or select a node first");
  const copy = node.clone();
  copy.x = node.x + {offset_x};
  copy.y = node.y + {offset_y};
  if (node.parent && copy.parent !== node.parent) {{
    node.parent.appendChild(copy);
  }}
  figma.currentPage.selection = [copy];
  return {{ id: copy.id, name: copy.name, type: copy.type }};
}})()"#,
        target = target_node_expr(node_id),
        offset_x = offset_x,
        offset_y = offset_y,
    )
}

fn export_snippet(node_id: Option<&str>, format: &str, scale: f64) -> String {
    // SVG exports take no scale constraint.
    let settings = if format == "SVG" {
        r#"{ format: "SVG" }"#.to_string()
    } else {
        format!(
            r#"{{ format: "{}", constraint: {{ type: "SCALE", value: {} }} }}"#,
            format, scale
        )
    };
    format!(
        r#"(async () => {{
  const node = {target};
  if (!node) throw new Error("No node to export; pass node_id or select a node first");
  const bytes = await node.exportAsync({settings});
  return {{ id: node.id, name: node.name, base64: figma.base64Encode(bytes) }};
}})()"#,
        target = target_node_expr(node_id),
        settings = settings,
    )
}

fn inspect_snippet(depth: u64, limit: u64) -> String {
    format!(
        r#"(async () => {{
  const describe = (n, depth) => {{
    const out = {{ id: n.id, name: n.name, type: n.type }};
    if ("visible" in n) out.visible = n.visible;
    if ("x" in n) {{ out.x = n.x; out.y = n.y; }}
    if ("width" in n) {{ out.width = n.width; out.height = n.height; }}
    if ("fills" in n && Array.isArray(n.fills)) out.fills = n.fills.slice(0, 3);
    if ("opacity" in n) out.opacity = n.opacity;
    if (n.type === "TEXT") out.characters = n.characters.slice(0, 200);
    if ("children" in n) {{
      out.childCount = n.children.length;
      if (depth > 0) out.children = n.children.slice(0, {limit}).map(c => describe(c, depth - 1));
    }}
    return out;
  }};
  const selection = figma.currentPage.selection.slice(0, {limit});
  if (selection.length === 0) throw new Error("Nothing selected; select nodes or use figma_find_nodes first");
  return {{ count: selection.length, nodes: selection.map(n => describe(n, {depth})) }};
}})()"#,
        depth = depth,
        limit = limit,
    )
}

pub struct FindNodesTool;

#[async_trait]
impl Tool for FindNodesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_find_nodes",
            description: "Find nodes on the current page by name substring and/or node type, optionally selecting them and scrolling them into view.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Case-insensitive name substring"
                    },
                    "node_type": {
                        "type": "string",
                        "description": "Exact node type filter, e.g. FRAME, TEXT, COMPONENT"
                    },
                    "select": {
                        "type": "boolean",
                        "description": "Select the matches and scroll them into view (default: true)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum matches to return (default: 50)"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let has_query = params.get("query").and_then(|v| v.as_str()).is_some();
        let has_type = params.get("node_type").and_then(|v| v.as_str()).is_some();
        if !has_query && !has_type {
            return Err(Error::Validation(
                "Provide 'query' and/or 'node_type'".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let snippet = find_nodes_snippet(
            params.get("query").and_then(|v| v.as_str()),
            params.get("node_type").and_then(|v| v.as_str()),
            params.get("select").and_then(|v| v.as_bool()).unwrap_or(true),
            params.get("limit").and_then(|v| v.as_u64()).unwrap_or(50),
        );

        let mut sessions = ctx.sessions.lock().await;
        let outcome = gateway::run_snippet(&mut sessions, &snippet).await?;
        Ok(outcome.into_envelope())
    }
}

pub struct DuplicateNodeTool;

#[async_trait]
impl Tool for DuplicateNodeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_duplicate_node",
            description: "Duplicate a node (by id, or the first selected node), offset the copy, and select it.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "node_id": {
                        "type": "string",
                        "description": "Node to duplicate (default: first selected node)"
                    },
                    "offset_x": { "type": "number", "description": "Horizontal offset of the copy (default: 20)" },
                    "offset_y": { "type": "number", "description": "Vertical offset of the copy (default: 20)" }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let snippet = duplicate_snippet(
            params.get("node_id").and_then(|v| v.as_str()),
            params.get("offset_x").and_then(|v| v.as_f64()).unwrap_or(20.0),
            params.get("offset_y").and_then(|v| v.as_f64()).unwrap_or(20.0),
        );

        let mut sessions = ctx.sessions.lock().await;
        let outcome = gateway::run_snippet(&mut sessions, &snippet).await?;
        Ok(outcome.into_envelope())
    }
}

pub struct ExportNodeTool;

#[async_trait]
impl Tool for ExportNodeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_export_node",
            description: "Export a node (by id, or the first selected node) as PNG, JPG, SVG or PDF and write it to a file. Returns the written path.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "node_id": {
                        "type": "string",
                        "description": "Node to export (default: first selected node)"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["PNG", "JPG", "SVG", "PDF"],
                        "description": "Export format (default: PNG)"
                    },
                    "scale": {
                        "type": "number",
                        "description": "Scale factor for raster formats (default: 1)"
                    },
                    "output_path": {
                        "type": "string",
                        "description": "File path for the export (default: under the workspace exports dir)"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if let Some(format) = params.get("format").and_then(|v| v.as_str()) {
            if !matches!(format, "PNG" | "JPG" | "SVG" | "PDF") {
                return Err(Error::Validation(format!(
                    "Invalid format '{}'. Valid: PNG, JPG, SVG, PDF",
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
            .unwrap_or("PNG");
        let scale = params.get("scale").and_then(|v| v.as_f64()).unwrap_or(1.0);
        let snippet = export_snippet(
            params.get("node_id").and_then(|v| v.as_str()),
            format,
            scale,
        );

        let mut sessions = ctx.sessions.lock().await;
        let session = sessions.ensure_active().await?;
        let payload = session.evaluate(&gateway::wrap_async(&snippet)).await?;
        drop(sessions);

        if payload.get("exceptionDetails").is_some() {
            return Ok(gateway::classify_evaluation(&payload).into_envelope());
        }

        let value = payload
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null);
        let data = value
            .get("base64")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("Export returned no data".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| Error::Tool(format!("Export payload was not valid base64: {}", e)))?;

        let name = value.get("name").and_then(|v| v.as_str()).unwrap_or("node");
        let path = match params.get("output_path").and_then(|v| v.as_str()) {
            Some(p) => std::path::PathBuf::from(p),
            None => {
                let stamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                let safe_name: String = name
                    .chars()
                    .map(|c| if c.is_alphanumeric() { c } else { '_' })
                    .collect();
                ctx.workspace.join("exports").join(format!(
                    "{}_{}.{}",
                    safe_name,
                    stamp,
                    format.to_lowercase()
                ))
            }
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &bytes)?;

        Ok(json!({
            "status": "ok",
            "id": value.get("id"),
            "name": name,
            "format": format,
            "path": path.display().to_string(),
            "bytes": bytes.len(),
        }))
    }
}

pub struct InspectSelectionTool;

#[async_trait]
impl Tool for InspectSelectionTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_inspect_selection",
            description: "Deep-inspect the selected nodes: geometry, fills, opacity, text content, and children down to a bounded depth.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "depth": {
                        "type": "integer",
                        "description": "Child recursion depth (default: 2)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum nodes per level (default: 10)"
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
        let snippet = inspect_snippet(
            params.get("depth").and_then(|v| v.as_u64()).unwrap_or(2),
            params.get("limit").and_then(|v| v.as_u64()).unwrap_or(10),
        );

        let mut sessions = ctx.sessions.lock().await;
        let outcome = gateway::run_snippet(&mut sessions, &snippet).await?;
        Ok(outcome.into_envelope())
    }
}
