//! JSON-RPC 2.0 envelopes for MCP, self-contained — no external JSON-RPC
//! library.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// An incoming request (or notification; notifications are answered like
/// requests since this server never initiates traffic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default = "RequestId::null")]
    pub id: RequestId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl RequestId {
    fn null() -> Self {
        RequestId::Null
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
    pub id: RequestId,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn from_error(id: RequestId, err: RpcError) -> Self {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(ErrorObject {
                code: err.code(),
                message: err.message(),
            }),
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
}

/// Standard JSON-RPC 2.0 error classes.
#[derive(Debug, Clone)]
pub enum RpcError {
    ParseError(String),
    InvalidRequest(String),
    MethodNotFound(String),
    InvalidParams(String),
    InternalError(String),
}

impl RpcError {
    pub fn code(&self) -> i32 {
        match self {
            RpcError::ParseError(_) => -32700,
            RpcError::InvalidRequest(_) => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::InternalError(_) => -32603,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RpcError::ParseError(msg) => format!("Parse error: {}", msg),
            RpcError::InvalidRequest(msg) => format!("Invalid request: {}", msg),
            RpcError::MethodNotFound(method) => format!("Method not found: {}", method),
            RpcError::InvalidParams(msg) => format!("Invalid params: {}", msg),
            RpcError::InternalError(msg) => format!("Internal error: {}", msg),
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for RpcError {}

pub fn parse_request(text: &str) -> Result<Request, RpcError> {
    let request: Request =
        serde_json::from_str(text).map_err(|e| RpcError::ParseError(e.to_string()))?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(RpcError::InvalidRequest(format!(
            "expected jsonrpc '{}', got '{}'",
            JSONRPC_VERSION, request.jsonrpc
        )));
    }

    Ok(request)
}

pub fn serialize_response(response: &Response) -> Result<String, RpcError> {
    serde_json::to_string(response).map_err(|e| RpcError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let json = r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.method, "tools/list");
        assert_eq!(req.id, RequestId::Number(1));
        assert!(req.params.is_none());
    }

    #[test]
    fn test_parse_request_string_id_and_params() {
        let json = r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"x"},"id":"abc"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, RequestId::String("abc".to_string()));
        assert!(req.params.is_some());
    }

    #[test]
    fn test_parse_notification_defaults_null_id() {
        let json = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, RequestId::Null);
    }

    #[test]
    fn test_parse_rejects_wrong_version() {
        let json = r#"{"jsonrpc":"1.0","method":"x","id":1}"#;
        assert!(matches!(
            parse_request(json),
            Err(RpcError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_response_success_omits_error() {
        let resp = Response::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serialize_response(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_response_error_carries_code() {
        let resp = Response::from_error(
            RequestId::Number(1),
            RpcError::MethodNotFound("unknown".to_string()),
        );
        let json = serialize_response(&resp).unwrap();
        assert!(json.contains("-32601"));
        assert!(!json.contains("\"result\""));
    }
}
