use querypilot::agent::Agent;
use querypilot::credentials::CredentialManager;
use querypilot::errors::{AgentError, AgentResult};
use querypilot::gateway::client::ToolGatewayClient;
use querypilot::gateway::invoker::GatewayToolInvoker;
use querypilot::providers::anthropic::AnthropicProvider;
use querypilot::query::QueryClient;
use std::sync::Arc;

use crate::configuration::Settings;
use crate::store::SavedStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub invoker: GatewayToolInvoker,
    pub credentials: Arc<CredentialManager>,
    pub query: Option<Arc<QueryClient>>,
    pub store: Arc<SavedStore>,
}

impl AppState {
    pub fn from_settings(settings: Settings) -> AgentResult<Self> {
        let provider = AnthropicProvider::new(settings.provider.into_config())?;
        let agent = Agent::new(Box::new(provider)).with_config(settings.agent.into_config());

        let credentials = Arc::new(CredentialManager::new(
            settings.gateway.auth.into_source(),
        ));
        let client = Arc::new(ToolGatewayClient::new(settings.gateway.endpoint)?);
        let query = settings
            .gateway
            .query_endpoint
            .map(QueryClient::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            agent: Arc::new(agent),
            invoker: GatewayToolInvoker::new(client, credentials.clone()),
            credentials,
            query,
            store: Arc::new(SavedStore::new(settings.store.path)),
        })
    }

    pub fn query_client(&self) -> AgentResult<Arc<QueryClient>> {
        self.query.clone().ok_or_else(|| {
            AgentError::Configuration("No query endpoint is configured".to_string())
        })
    }
}
