use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::rpc::{JsonRpcRequest, JsonRpcResponse};
use super::sse;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

const ACCEPT_JSON_OR_SSE: &str = "application/json, text/event-stream";

#[derive(Deserialize)]
struct ToolList {
    #[serde(default)]
    tools: Vec<Tool>,
}

/// Lists and calls tools on the remote gateway. Each call takes the bearer
/// credential explicitly so refresh policy stays with the caller.
pub struct ToolGatewayClient {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl ToolGatewayClient {
    pub fn new<S: Into<String>>(endpoint: S) -> AgentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Decode a response body that is either plain JSON or an SSE stream
    fn decode_body(content_type: &str, body: &str) -> AgentResult<Value> {
        if !content_type.starts_with("text/event-stream") {
            if let Ok(value) = serde_json::from_str::<Value>(body) {
                return Ok(value);
            }
        }
        sse::last_data_json(body).ok_or_else(|| {
            AgentError::InvalidResponse("No JSON payload in gateway response".to_string())
        })
    }

    async fn rpc(&self, credential: &str, method: &str, params: Value) -> AgentResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        debug!(method, id, "sending gateway request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .header(ACCEPT, ACCEPT_JSON_OR_SSE)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AgentError::Transport {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            });
        }

        let payload = Self::decode_body(&content_type, &body)?;
        let envelope: JsonRpcResponse = serde_json::from_value(payload)?;
        envelope.into_result()
    }

    pub async fn list_tools(&self, credential: &str) -> AgentResult<Vec<Tool>> {
        let result = self.rpc(credential, "tools/list", json!({})).await?;
        let list: ToolList = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    pub async fn call_tool(
        &self,
        credential: &str,
        name: &str,
        arguments: Map<String, Value>,
    ) -> AgentResult<Value> {
        self.rpc(
            credential,
            "tools/call",
            json!({"name": name, "arguments": arguments}),
        )
        .await
    }
}
