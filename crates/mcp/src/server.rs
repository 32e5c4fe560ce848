//! Stdio MCP server: newline-delimited JSON-RPC on stdin/stdout.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::protocol::{self, Request, RequestId, Response, RpcError};
use crate::ToolResult;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Dispatch seam the host binary implements over its tool registry.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Tool descriptors for `tools/list`, each shaped
    /// `{name, description, inputSchema}`.
    async fn list_tools(&self) -> Vec<Value>;

    /// Run one tool call. Failures come back as error-flagged results, not
    /// transport errors.
    async fn call(&self, name: &str, arguments: Value) -> ToolResult;
}

pub struct McpServer<H: ToolHandler> {
    handler: Arc<H>,
    server_name: String,
    server_version: String,
}

impl<H: ToolHandler> McpServer<H> {
    pub fn new(handler: H, server_name: &str, server_version: &str) -> Self {
        McpServer {
            handler: Arc::new(handler),
            server_name: server_name.to_string(),
            server_version: server_version.to_string(),
        }
    }

    /// Serve until stdin closes. One request per line, one response per line.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!("MCP server listening on stdio");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);

        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                info!("stdin closed, shutting down");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("recv: {}", line);
            let response = self.handle_message(line).await;
            let response_json = protocol::serialize_response(&response)?;
            debug!("send: {}", response_json);

            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        Ok(())
    }

    async fn handle_message(&self, message: &str) -> Response {
        match protocol::parse_request(message) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => Response::from_error(RequestId::Null, err),
        }
    }

    async fn handle_request(&self, request: Request) -> Response {
        let id = request.id.clone();
        let params = request.params.unwrap_or(Value::Null);

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            // Pure notification; answered with an empty success since the
            // loop is strictly request/response.
            "notifications/initialized" => Response::success(id, json!({})),
            "tools/list" => {
                let tools = self.handler.list_tools().await;
                Response::success(id, json!({ "tools": tools }))
            }
            "tools/call" => self.handle_tools_call(id, params).await,
            "ping" => Response::success(id, json!({})),
            other => {
                warn!("Unknown method: {}", other);
                Response::from_error(id, RpcError::MethodNotFound(other.to_string()))
            }
        }
    }

    fn handle_initialize(&self, id: RequestId) -> Response {
        info!("MCP client initialized");
        Response::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version,
                }
            }),
        )
    }

    async fn handle_tools_call(&self, id: RequestId, params: Value) -> Response {
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => {
                return Response::from_error(
                    id,
                    RpcError::InvalidParams("missing 'name' field".to_string()),
                )
            }
        };

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or(Value::Object(serde_json::Map::new()));

        debug!(tool = %name, "tools/call");
        let result = self.handler.call(&name, arguments).await;

        Response::success(id, serde_json::to_value(result).unwrap_or(Value::Null))
    }
}
