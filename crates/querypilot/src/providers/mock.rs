use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{ContentBlock, Message};
use crate::models::tool::ToolDeclaration;
use crate::providers::base::{Provider, ProviderResponse, StopReason, Usage};

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<AgentResult<ProviderResponse>>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    configured: bool,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<AgentResult<ProviderResponse>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
            configured: true,
        }
    }

    /// A provider that reports a missing API key
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(vec![])
        }
    }

    /// Every message list the provider was called with, in call order
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        self.requests.clone()
    }
}

/// An end of turn response carrying the given text
pub fn end_turn(text: &str, usage: Usage) -> ProviderResponse {
    ProviderResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        usage,
    }
}

/// A tool use response carrying the given blocks
pub fn tool_use(content: Vec<ContentBlock>, usage: Usage) -> ProviderResponse {
    ProviderResponse {
        content,
        stop_reason: StopReason::ToolUse,
        usage,
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn ensure_configured(&self) -> AgentResult<()> {
        if self.configured {
            Ok(())
        } else {
            Err(AgentError::Configuration("No API key".to_string()))
        }
    }

    async fn complete(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[ToolDeclaration],
    ) -> AgentResult<ProviderResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok(end_turn("", Usage::default()))
        } else {
            responses.remove(0)
        }
    }
}
