use figbridge_core::{Config, Paths};
use figbridge_tools::{Tool, ToolContext, ToolRegistry};
use serde_json::Value;

/// Run a direct tool call, bypassing the MCP transport.
pub async fn tool(tool_name: &str, params_json: &str, port: Option<u16>) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let paths = Paths::new();
    let mut config = Config::load_or_default(&paths)?;
    if let Some(port) = port {
        config.remote.port = port;
    }

    let tool = registry.get(tool_name).ok_or_else(|| {
        anyhow::anyhow!(
            "Tool '{}' not found. Use `figbridge tools list` to see available tools.",
            tool_name
        )
    })?;

    let params: Value = serde_json::from_str(params_json)
        .map_err(|e| anyhow::anyhow!("Failed to parse JSON params: {}\nInput: {}", e, params_json))?;

    if let Err(e) = tool.validate(&params) {
        anyhow::bail!(
            "Parameter validation failed: {}\nUse `figbridge tools info {}` for parameter details.",
            e,
            tool_name
        );
    }

    let ctx = ToolContext::new(config, paths.workspace());
    let result = tool.execute(ctx, params).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
