use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new<S: Into<String>>(id: u64, method: S, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// The result payload, or the explicit error object as a protocol error
    pub fn into_result(self) -> AgentResult<Value> {
        if let Some(error) = self.error {
            return Err(AgentError::Protocol {
                code: error.code,
                message: error.message,
            });
        }
        self.result.ok_or_else(|| {
            AgentError::InvalidResponse("JSON-RPC response has neither result nor error".to_string())
        })
    }
}
