use figbridge_core::{Config, Paths};
use figbridge_mcp::{McpServer, ToolHandler, ToolResult};
use figbridge_tools::remote::discovery;
use figbridge_tools::{ToolContext, ToolRegistry};
use serde_json::Value;
use tracing::{info, warn};

/// Bridges MCP tool calls into the tool registry.
struct RegistryHandler {
    registry: ToolRegistry,
    ctx: ToolContext,
}

#[async_trait::async_trait]
impl ToolHandler for RegistryHandler {
    async fn list_tools(&self) -> Vec<Value> {
        self.registry.mcp_tool_schemas()
    }

    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        match self
            .registry
            .execute(name, self.ctx.clone(), arguments)
            .await
        {
            Ok(value) => ToolResult::json(&value),
            // Every failure becomes a readable message, never a raw
            // protocol error.
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

/// Run the stdio MCP server.
pub async fn run(port: Option<u16>, require_target: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let mut config = Config::load_or_default(&paths)?;
    if let Some(port) = port {
        config.remote.port = port;
    }

    // Startup probe. An empty listing is only fatal when the operator
    // insisted on a target being present.
    let found = discovery::fetch_targets(config.remote.port).await;
    if found.is_empty() {
        if require_target {
            anyhow::bail!(
                "No Figma tab reachable on port {}. Start the browser with \
                 --remote-debugging-port={} and open a document.",
                config.remote.port,
                config.remote.port
            );
        }
        warn!(
            port = config.remote.port,
            "No Figma tab discoverable yet; connecting lazily on first use"
        );
    } else {
        info!(count = found.len(), "Discovered open Figma tab(s)");
    }

    let ctx = ToolContext::new(config, paths.workspace());
    let handler = RegistryHandler {
        registry: ToolRegistry::with_defaults(),
        ctx,
    };

    let mut server = McpServer::new(handler, "figbridge", env!("CARGO_PKG_VERSION"));
    server.run().await
}
