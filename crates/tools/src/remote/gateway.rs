//! Code execution gateway: the single choke point through which all remote
//! mutation and inspection happens.
//!
//! Classification is pure — reproducible from the raw `Runtime.evaluate`
//! payload alone, independent of transport.

use figbridge_core::{Error, Result};
use serde_json::Value;
use tracing::debug;

use super::sessions::SessionRegistry;

/// Message shown when an evaluation succeeds without producing a value.
pub const NO_VALUE_MESSAGE: &str = "Code executed successfully (no return value)";

/// Fixed remediation hints, matched by substring against the failure text in
/// table order; only the first match contributes a hint.
pub const HINT_TABLE: &[(&str, &str)] = &[
    (
        "figma is not defined",
        "The figma global only exists inside an open Figma document. Make sure the active tab \
         is a design file, not the file browser, then retry.",
    ),
    (
        "loadFontAsync",
        "Await figma.loadFontAsync({ family, style }) for every font used on a text node \
         before changing its characters or font properties.",
    ),
    (
        "Cannot read properties of null",
        "A single-match query (findOne / getNodeByIdAsync) returned null. Check the result \
         for null before dereferencing it.",
    ),
    (
        "is not a function",
        "No method with that name on the target object. Check the exact casing and whether \
         the Plugin API offers only an Async variant.",
    ),
    (
        "layoutSizing",
        "layoutSizingHorizontal/layoutSizingVertical can only be set after the node has been \
         appended to an auto-layout parent. Append first, then size.",
    ),
    (
        "read-only",
        "That property is read-only. Copy the value (e.g. const fills = clone(node.fills)), \
         modify the copy, and assign it back.",
    ),
    (
        "getNodeById",
        "figma.getNodeById is unavailable once dynamic page loading is on; use \
         await figma.getNodeByIdAsync(id) instead.",
    ),
    (
        "font",
        "Font operations usually require the font to be loaded first: \
         await figma.loadFontAsync(...).",
    ),
    (
        "timed out",
        "Execution exceeded the 30 second budget. Split the snippet into smaller steps or \
         touch fewer nodes per call.",
    ),
];

/// Outcome of one remote evaluation, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Success(String),
    Failure {
        message: String,
        hint: Option<&'static str>,
    },
}

impl ExecOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecOutcome::Success(_))
    }

    /// Flatten into the uniform envelope capability tools return.
    pub fn into_envelope(self) -> Value {
        match self {
            ExecOutcome::Success(text) => serde_json::json!({
                "status": "ok",
                "result": text,
            }),
            ExecOutcome::Failure { message, hint } => {
                let mut obj = serde_json::json!({
                    "status": "error",
                    "message": message,
                });
                if let Some(hint) = hint {
                    obj["hint"] = Value::String(hint.to_string());
                }
                obj
            }
        }
    }
}

/// First matching remediation hint for a failure message, if any.
pub fn remediation_hint(message: &str) -> Option<&'static str> {
    HINT_TABLE
        .iter()
        .find(|(signature, _)| message.contains(signature))
        .map(|(_, hint)| *hint)
}

/// Wrap a snippet in an async IIFE unless the caller already wrote one, so
/// top-level `await` is always legal regardless of caller style.
pub fn wrap_async(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.starts_with("(async") {
        trimmed.to_string()
    } else {
        format!("(async () => {{\n{}\n}})()", trimmed)
    }
}

/// Classify a raw `Runtime.evaluate` payload.
pub fn classify_evaluation(payload: &Value) -> ExecOutcome {
    if let Some(details) = payload.get("exceptionDetails") {
        let message = exception_message(details);
        let hint = remediation_hint(&message);
        return ExecOutcome::Failure { message, hint };
    }

    let result = payload.get("result").cloned().unwrap_or(Value::Null);
    if result.get("type").and_then(|v| v.as_str()) == Some("undefined") {
        return ExecOutcome::Success(NO_VALUE_MESSAGE.to_string());
    }

    match result.get("value") {
        Some(v @ Value::Object(_)) | Some(v @ Value::Array(_)) => ExecOutcome::Success(
            serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
        ),
        Some(Value::String(s)) => ExecOutcome::Success(s.clone()),
        Some(Value::Null) | None => ExecOutcome::Success("null".to_string()),
        Some(other) => ExecOutcome::Success(other.to_string()),
    }
}

/// Best available description for a thrown exception: structured description,
/// then the raw thrown value, then the generic remote-error text.
fn exception_message(details: &Value) -> String {
    if let Some(desc) = details
        .pointer("/exception/description")
        .and_then(|v| v.as_str())
    {
        return desc.to_string();
    }
    if let Some(val) = details.pointer("/exception/value") {
        if !val.is_null() {
            return match val {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
    }
    if let Some(text) = details.get("text").and_then(|v| v.as_str()) {
        return text.to_string();
    }
    "Unknown error".to_string()
}

/// Run a snippet on the active tab and classify the outcome. Transport
/// timeouts fold into the same failure shape as remote exceptions; other
/// transport errors propagate for the tool boundary to report.
pub async fn run_snippet(registry: &mut SessionRegistry, code: &str) -> Result<ExecOutcome> {
    let session = registry.ensure_active().await?;
    let wrapped = wrap_async(code);
    debug!(bytes = wrapped.len(), tab = %session.id, "Evaluating snippet");

    match session.evaluate(&wrapped).await {
        Ok(payload) => Ok(classify_evaluation(&payload)),
        Err(Error::Timeout(msg)) => Ok(ExecOutcome::Failure {
            hint: remediation_hint(&msg),
            message: msg,
        }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrap_async_plain_snippet() {
        let wrapped = wrap_async("figma.currentPage.name");
        assert!(wrapped.starts_with("(async () => {"));
        assert!(wrapped.ends_with("})()"));
        assert!(wrapped.contains("figma.currentPage.name"));
    }

    #[test]
    fn test_wrap_async_leaves_iife_alone() {
        let code = "(async () => { return 1; })()";
        assert_eq!(wrap_async(code), code);
    }

    #[test]
    fn test_classify_object_pretty_prints() {
        let payload = json!({"result": {"type": "object", "value": {"a": 1}}});
        match classify_evaluation(&payload) {
            ExecOutcome::Success(text) => assert!(text.contains("\"a\": 1")),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_undefined_uses_fixed_message() {
        let payload = json!({"result": {"type": "undefined"}});
        assert_eq!(
            classify_evaluation(&payload),
            ExecOutcome::Success(NO_VALUE_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_classify_scalar_and_null() {
        let payload = json!({"result": {"type": "number", "value": 42}});
        assert_eq!(
            classify_evaluation(&payload),
            ExecOutcome::Success("42".to_string())
        );

        let payload = json!({"result": {"type": "object", "subtype": "null", "value": null}});
        assert_eq!(
            classify_evaluation(&payload),
            ExecOutcome::Success("null".to_string())
        );
    }

    #[test]
    fn test_classify_exception_prefers_description() {
        let payload = json!({
            "result": {"type": "object"},
            "exceptionDetails": {
                "text": "Uncaught (in promise)",
                "exception": {
                    "description": "Error: in loadFontAsync: font not loaded",
                    "value": null,
                }
            }
        });
        match classify_evaluation(&payload) {
            ExecOutcome::Failure { message, hint } => {
                assert!(message.contains("loadFontAsync"));
                assert!(hint.unwrap().contains("loadFontAsync"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_exception_falls_back_to_value_then_text() {
        let payload = json!({
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": {"value": "thrown string"}
            }
        });
        match classify_evaluation(&payload) {
            ExecOutcome::Failure { message, .. } => assert_eq!(message, "thrown string"),
            other => panic!("expected failure, got {:?}", other),
        }

        let payload = json!({"exceptionDetails": {"text": "Uncaught SyntaxError"}});
        match classify_evaluation(&payload) {
            ExecOutcome::Failure { message, .. } => assert_eq!(message, "Uncaught SyntaxError"),
            other => panic!("expected failure, got {:?}", other),
        }

        let payload = json!({"exceptionDetails": {}});
        match classify_evaluation(&payload) {
            ExecOutcome::Failure { message, .. } => assert_eq!(message, "Unknown error"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_hint_table_first_match_wins() {
        // Contains both the loadFontAsync signature and the generic font
        // signature; the earlier entry must win.
        let hint = remediation_hint("Error: in loadFontAsync: unloaded font").unwrap();
        assert!(hint.contains("loadFontAsync"));

        // Generic font mention only.
        let hint = remediation_hint("cannot write font of node").unwrap();
        assert!(hint.contains("loadFontAsync"));

        // The global-unavailable signature outranks everything.
        let hint = remediation_hint("figma is not defined").unwrap();
        assert!(hint.contains("figma global"));
    }

    #[test]
    fn test_hint_table_signatures_all_fire() {
        for (signature, _) in HINT_TABLE {
            assert!(
                remediation_hint(signature).is_some(),
                "signature {:?} did not match its own table entry",
                signature
            );
        }
    }

    #[test]
    fn test_unmatched_message_gets_no_hint() {
        assert!(remediation_hint("something completely different").is_none());
    }

    #[test]
    fn test_timeout_message_matches_timeout_signature() {
        let msg = "CDP command 'Runtime.evaluate' timed out after 30s";
        let hint = remediation_hint(msg).unwrap();
        assert!(hint.contains("30 second"));
    }

    #[test]
    fn test_envelope_shapes() {
        let ok = ExecOutcome::Success("42".to_string()).into_envelope();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["result"], "42");

        let err = ExecOutcome::Failure {
            message: "boom".to_string(),
            hint: Some("try this"),
        }
        .into_envelope();
        assert_eq!(err["status"], "error");
        assert_eq!(err["message"], "boom");
        assert_eq!(err["hint"], "try this");

        let bare = ExecOutcome::Failure {
            message: "boom".to_string(),
            hint: None,
        }
        .into_envelope();
        assert!(bare.get("hint").is_none());
    }
}
