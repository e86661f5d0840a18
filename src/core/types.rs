//! JSON-RPC envelope types shared by the HTTP and WebSocket transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Method name every request is sent under; the target api and method travel in `params`.
pub const CALL_METHOD: &str = "call";

/// Method name of server-pushed notification frames.
pub const NOTICE_METHOD: &str = "notice";

/// Outbound request: `{"method":"call","id":N,"params":[api, method, args]}`.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'static str,
    pub id: u64,
    pub params: (&'a str, &'a str, &'a [Value]),
}

impl<'a> RpcRequest<'a> {
    pub fn call(id: u64, api: &'a str, method: &'a str, args: &'a [Value]) -> Self {
        Self {
            method: CALL_METHOD,
            id,
            params: (api, method, args),
        }
    }
}

/// Any inbound frame. Responses carry `id`, notices carry
/// `method == "notice"` and `params`. Neither `result` nor `error` is
/// required on a response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcEnvelope {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Vec<Value>>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcEnvelope {
    pub fn is_notice(&self) -> bool {
        self.method.as_deref() == Some(NOTICE_METHOD)
    }

    /// Collapse into the caller-facing outcome. A missing result is `null`.
    pub fn into_outcome(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Error object returned by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RpcErrorData>,
}

/// Structured exception details. `name` and `code` identify the chain-side
/// rejection (for example `assert_exception`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorData {
    pub code: i64,
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stack: Vec<Value>,
}

impl RpcError {
    pub fn name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    pub fn data_code(&self) -> Option<i64> {
        self.data.as_ref().map(|d| d.code)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}
