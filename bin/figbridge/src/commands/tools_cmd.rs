use figbridge_tools::{Tool, ToolRegistry};

/// List all registered tools.
pub async fn list() -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let schemas = registry.mcp_tool_schemas();

    println!();
    println!("Registered tools ({} total)", schemas.len());
    println!();

    for schema in &schemas {
        let name = schema["name"].as_str().unwrap_or("");
        let desc = schema["description"].as_str().unwrap_or("");
        let short_desc: String = desc.chars().take(70).collect();
        let ellipsis = if desc.chars().count() > 70 { "..." } else { "" };
        println!("  {:<26} {}{}", name, short_desc, ellipsis);
    }
    println!();

    Ok(())
}

/// Show one tool's full schema.
pub async fn info(tool_name: &str) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let tool = registry.get(tool_name).ok_or_else(|| {
        anyhow::anyhow!(
            "Tool '{}' not found. Use `figbridge tools list` to see available tools.",
            tool_name
        )
    })?;

    let schema = tool.schema();
    println!();
    println!("{}", schema.name);
    println!("  {}", schema.description);
    println!();
    println!("Parameters:");
    println!("{}", serde_json::to_string_pretty(&schema.parameters)?);
    Ok(())
}
