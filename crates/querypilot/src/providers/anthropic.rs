use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, ProviderResponse};
use super::configs::AnthropicProviderConfig;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::ToolDeclaration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> AgentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn api_key(&self) -> AgentResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Configuration("Anthropic API key is not configured".to_string())
            })
    }

    /// Pull the human readable message out of an error payload, if there is one
    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| body.to_string())
    }

    async fn post(&self, payload: Value) -> AgentResult<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key()?)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(AgentError::Transport {
                status: status.as_u16(),
                message: Self::error_message(&error_text),
            })
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn ensure_configured(&self) -> AgentResult<()> {
        self.api_key().map(|_| ())
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDeclaration],
    ) -> AgentResult<ProviderResponse> {
        let mut payload = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system,
            "messages": messages,
        });

        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }

        let response = self.post(payload).await?;

        if response.get("type").and_then(Value::as_str) == Some("error") {
            let error = &response["error"];
            return Err(AgentError::Protocol {
                code: 0,
                message: format!(
                    "{}: {}",
                    error["type"].as_str().unwrap_or("error"),
                    error["message"].as_str().unwrap_or("unknown error")
                ),
            });
        }

        serde_json::from_value(response).map_err(|e| {
            AgentError::InvalidResponse(format!("Invalid response format from Anthropic API: {}", e))
        })
    }
}
