use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AgentResult;
use crate::models::message::{ContentBlock, Message};
use crate::models::tool::ToolDeclaration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    #[serde(other)]
    Other,
}

/// One reply from the reasoning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub usage: Usage,
}

impl ProviderResponse {
    pub fn has_tool_use(&self) -> bool {
        self.content.iter().any(|c| c.as_tool_use().is_some())
    }
}

/// Base trait for reasoning engines
#[async_trait]
pub trait Provider: Send + Sync {
    /// Fail early when a required credential is missing
    fn ensure_configured(&self) -> AgentResult<()> {
        Ok(())
    }

    /// Generate the next reply for the conversation
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDeclaration],
    ) -> AgentResult<ProviderResponse>;
}
