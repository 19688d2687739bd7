use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::client::ToolGatewayClient;
use crate::agent::ToolInvoker;
use crate::credentials::CredentialManager;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

/// Tool list together with the credential it was fetched under
type CachedTools = Option<(String, Vec<Tool>)>;

/// Executes tools on the gateway with the shared credential, refreshing it once
/// when a call is rejected as unauthenticated.
#[derive(Clone)]
pub struct GatewayToolInvoker {
    client: Arc<ToolGatewayClient>,
    credentials: Arc<CredentialManager>,
    tools: Arc<RwLock<CachedTools>>,
}

impl GatewayToolInvoker {
    pub fn new(client: Arc<ToolGatewayClient>, credentials: Arc<CredentialManager>) -> Self {
        Self {
            client,
            credentials,
            tools: Arc::new(RwLock::new(None)),
        }
    }

    /// The gateway's tools, fetched once per credential and reused until the
    /// credential changes.
    pub async fn list_tools(&self) -> AgentResult<Vec<Tool>> {
        let current = self.credentials.get_valid_credential().await?;
        if let Some((token, tools)) = self.tools.read().await.as_ref() {
            if *token == current {
                return Ok(tools.clone());
            }
        }

        let (token, tools) = self
            .credentials
            .with_refresh(|token| {
                let client = self.client.clone();
                async move { client.list_tools(&token).await.map(|tools| (token, tools)) }
            })
            .await?;
        debug!(count = tools.len(), "fetched gateway tool list");
        *self.tools.write().await = Some((token, tools.clone()));
        Ok(tools)
    }
}

#[async_trait]
impl ToolInvoker for GatewayToolInvoker {
    async fn invoke(&self, name: &str, arguments: Value) -> AgentResult<Value> {
        let arguments: Map<String, Value> = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(AgentError::InvalidRequest(format!(
                    "Tool arguments must be an object, got {}",
                    other
                )))
            }
        };

        self.credentials
            .with_refresh(|token| {
                let client = self.client.clone();
                let arguments = arguments.clone();
                async move { client.call_tool(&token, name, arguments).await }
            })
            .await
    }
}
