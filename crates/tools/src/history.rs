//! Undo/redo against the active Figma tab.
//!
//! Undo goes through the Plugin API (`figma.triggerUndo`). The API has no
//! redo counterpart, so redo dispatches Ctrl+Shift+Z key events instead.

use async_trait::async_trait;
use figbridge_core::{Error, Result};
use serde_json::{json, Value};

use crate::remote::gateway;
use crate::{Tool, ToolContext, ToolSchema};

const MAX_STEPS: u64 = 50;

fn steps_param(params: &Value) -> u64 {
    params
        .get("steps")
        .and_then(|v| v.as_u64())
        .unwrap_or(1)
        .clamp(1, MAX_STEPS)
}

fn validate_steps(params: &Value) -> Result<()> {
    if let Some(v) = params.get("steps") {
        match v.as_u64() {
            Some(n) if (1..=MAX_STEPS).contains(&n) => {}
            _ => {
                return Err(Error::Validation(format!(
                    "'steps' must be an integer between 1 and {}",
                    MAX_STEPS
                )))
            }
        }
    }
    Ok(())
}

pub struct UndoStepsTool;

#[async_trait]
impl Tool for UndoStepsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_undo_steps",
            description: "Undo the last N actions in the active Figma document.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "steps": {
                        "type": "integer",
                        "description": "Number of undo steps (default: 1, max: 50)"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        validate_steps(params)
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let steps = steps_param(&params);
        let snippet = format!(
            "for (let i = 0; i < {steps}; i++) {{ figma.triggerUndo(); }}\nreturn {{ undone: {steps} }};",
        );

        let mut sessions = ctx.sessions.lock().await;
        let outcome = gateway::run_snippet(&mut sessions, &snippet).await?;
        Ok(outcome.into_envelope())
    }
}

pub struct RedoStepsTool;

#[async_trait]
impl Tool for RedoStepsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "figma_redo_steps",
            description: "Redo the last N undone actions in the active Figma document.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "steps": {
                        "type": "integer",
                        "description": "Number of redo steps (default: 1, max: 50)"
                    }
                },
                "required": []
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        validate_steps(params)
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let steps = steps_param(&params);

        let mut sessions = ctx.sessions.lock().await;
        let session = sessions.ensure_active().await?;

        // Ctrl+Shift+Z; modifiers bitmask: Ctrl = 2, Shift = 8.
        for _ in 0..steps {
            for event_type in ["keyDown", "keyUp"] {
                session
                    .transport
                    .call(
                        "Input.dispatchKeyEvent",
                        json!({
                            "type": event_type,
                            "key": "z",
                            "code": "KeyZ",
                            "windowsVirtualKeyCode": 90,
                            "modifiers": 10,
                        }),
                    )
                    .await?;
            }
        }

        Ok(json!({"status": "ok", "redone": steps}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas() {
        assert_eq!(UndoStepsTool.schema().name, "figma_undo_steps");
        assert_eq!(RedoStepsTool.schema().name, "figma_redo_steps");
    }

    #[test]
    fn test_steps_validation_and_clamp() {
        assert!(validate_steps(&json!({})).is_ok());
        assert!(validate_steps(&json!({"steps": 5})).is_ok());
        assert!(validate_steps(&json!({"steps": 0})).is_err());
        assert!(validate_steps(&json!({"steps": 100})).is_err());
        assert_eq!(steps_param(&json!({})), 1);
        assert_eq!(steps_param(&json!({"steps": 7})), 7);
    }
}
