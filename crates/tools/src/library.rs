//! Library inventory tools: components, styles, design tokens (variables).

use async_trait::async_trait;
use figbridge_core::Result;
use serde_json::{json, Value};

use crate::remote::gateway;
use crate::{Tool, ToolContext, ToolSchema};

const LIST_COMPONENTS_SNIPPET: &str = r#"(async () => {
  await figma.loadAllPagesAsync();
  const comps = figma.root.findAllWithCriteria({ types: ["COMPONENT", "COMPONENT_SET"] }).slice(0, 200);
  return {
    count: comps.length,
    components: comps.map(c => ({
      id: c.id,
      name: c.name,
      type: c.type,
      key: c.key || null,
      page: c.parent && c.parent.type === "PAGE" ? c.parent.name : null,
    })),
  };
})()"#;

const LIST_STYLES_SNIPPET: &str = r#"(async () => {
  const [paint, text, effect, grid] = await Promise.all([
    figma.getLocalPaintStylesAsync(),
    figma.getLocalTextStylesAsync(),
    figma.getLocalEffectStylesAsync(),
    figma.getLocalGridStylesAsync(),
  ]);
  const brief = s => ({ id: s.id, name: s.name, description: s.description || "" });
  return {
    paint: paint.map(brief),
    text: text.map(brief),
    effect: effect.map(brief),
    grid: grid.map(brief),
  };
})()"#;

const LIST_TOKENS_SNIPPET: &str = r#"(async () => {
  const collections = await figma.variables.getLocalVariableCollectionsAsync();
  const variables = await figma.variables.getLocalVariablesAsync();
  return {
    collections: collections.map(c => ({
      id: c.id,
      name: c.name,
      modes: c.modes.map(m => m.name),
    })),
    variables: variables.slice(0, 300).map(v => ({
      id: v.id,
      name: v.name,
      resolvedType: v.resolvedType,
      collectionId: v.variableCollectionId,
    })),
    variableCount: variables.length,
  };
})()"#;

pub struct ListComponentsTool;

#[async_trait]
impl Tool for ListComponentsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_list_components",
            description: "List the components and component sets defined in the active document, with the page each lives on.",
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
        let outcome = gateway::run_snippet(&mut sessions, LIST_COMPONENTS_SNIPPET).await?;
        Ok(outcome.into_envelope())
    }
}

pub struct ListStylesTool;

#[async_trait]
impl Tool for ListStylesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_list_styles",
            description: "List the local paint, text, effect and grid styles of the active document.",
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
        let outcome = gateway::run_snippet(&mut sessions, LIST_STYLES_SNIPPET).await?;
        Ok(outcome.into_envelope())
    }
}

pub struct ListTokensTool;

#[async_trait]
impl Tool for ListTokensTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_list_tokens",
            description: "List the local design tokens (variables) and their collections in the active document.",
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
        let outcome = gateway::run_snippet(&mut sessions, LIST_TOKENS_SNIPPET).await?;
        Ok(outcome.into_envelope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas() {
        assert_eq!(ListComponentsTool.schema().name, "figma_list_components");
        assert_eq!(ListStylesTool.schema().name, "figma_list_styles");
        assert_eq!(ListTokensTool.schema().name, "figma_list_tokens");
    }

    #[test]
    fn test_snippets_use_async_api_variants() {
        assert!(LIST_COMPONENTS_SNIPPET.contains("loadAllPagesAsync"));
        assert!(LIST_STYLES_SNIPPET.contains("getLocalPaintStylesAsync"));
        assert!(LIST_TOKENS_SNIPPET.contains("getLocalVariablesAsync"));
    }
}
