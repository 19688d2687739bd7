use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::debug_log::DebugLog;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::{join_text, ContentBlock, Message, MessageContent, Role};
use crate::models::tool::{Tool, ToolDeclaration};
use crate::progress::{emit, ProgressEvent, ProgressSender};
use crate::prompt_template::load_prompt_file;
use crate::providers::base::{Provider, Usage};

pub const DEFAULT_MAX_ROUNDS: usize = 25;

/// Executes a single named tool on behalf of the agent
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, name: &str, arguments: Value) -> AgentResult<Value>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on reasoning engine requests per run, `None` for no limit
    pub max_rounds: Option<usize>,
    /// Connection names advertised to the model in the system prompt
    pub connections: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: Some(DEFAULT_MAX_ROUNDS),
            connections: Vec::new(),
        }
    }
}

/// A successful tool call made during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: Map<String, Value>,
    pub result: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    RoundLimitExceeded { rounds: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub final_text: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub debug_log: DebugLog,
    pub token_usage: Usage,
    pub rounds: usize,
    pub elapsed_ms: u64,
}

impl RunOutcome {
    /// SQL statements the model sent to tools, in call order
    pub fn queries(&self) -> Vec<String> {
        self.tool_calls
            .iter()
            .filter_map(|call| {
                call.input
                    .get("query")
                    .or_else(|| call.input.get("sql"))
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .collect()
    }
}

/// Agent drives the reasoning engine and the remote tools until the engine
/// produces a final answer
pub struct Agent {
    provider: Box<dyn Provider>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new Agent with the specified provider and default limits
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Fail with a configuration error when the reasoning engine cannot be
    /// called, without making any request
    pub fn ensure_configured(&self) -> AgentResult<()> {
        self.provider.ensure_configured()
    }

    fn get_system_prompt(&self) -> AgentResult<String> {
        let context = json!({ "connections": self.config.connections });
        load_prompt_file("system.md", &context).map_err(|e| AgentError::Internal(e.to_string()))
    }

    /// Execute every tool use of one response in order, producing the matching
    /// tool results in the same order. Tool failures become error results.
    async fn execute_tools(
        &self,
        content: &[ContentBlock],
        invoker: &dyn ToolInvoker,
        tool_calls: &mut Vec<ToolCallRecord>,
        progress: Option<&ProgressSender>,
    ) -> Vec<ContentBlock> {
        let mut results = Vec::new();
        for tool_use in content.iter().filter_map(ContentBlock::as_tool_use) {
            emit(
                progress,
                ProgressEvent::ToolStart {
                    name: tool_use.name.to_string(),
                    input: tool_use.input.clone(),
                },
            );

            match invoker
                .invoke(tool_use.name, Value::Object(tool_use.input.clone()))
                .await
            {
                Ok(result) => {
                    debug!(tool = tool_use.name, "tool call completed");
                    let serialized = serde_json::to_string(&result).unwrap_or_default();
                    emit(
                        progress,
                        ProgressEvent::ToolComplete {
                            name: tool_use.name.to_string(),
                            result: result.clone(),
                        },
                    );
                    tool_calls.push(ToolCallRecord {
                        name: tool_use.name.to_string(),
                        input: tool_use.input.clone(),
                        result,
                    });
                    results.push(ContentBlock::tool_result(tool_use.id, serialized));
                }
                Err(err) => {
                    warn!(tool = tool_use.name, "tool call failed: {}", err);
                    emit(
                        progress,
                        ProgressEvent::ToolError {
                            name: tool_use.name.to_string(),
                            error: err.to_string(),
                        },
                    );
                    results.push(ContentBlock::tool_error(
                        tool_use.id,
                        format!("Error: {}", err),
                    ));
                }
            }
        }
        results
    }

    /// Answer `user_text` given the prior conversation, calling tools through
    /// `invoker` for as many rounds as the engine asks for.
    ///
    /// Individual tool failures are reported back to the engine as error results
    /// and never abort the run. Any error from the engine itself ends the run.
    pub async fn run(
        &self,
        user_text: &str,
        history: &[Message],
        tools: &[Tool],
        invoker: &dyn ToolInvoker,
        progress: Option<&ProgressSender>,
    ) -> AgentResult<RunOutcome> {
        self.ensure_configured()?;
        if user_text.trim().is_empty() {
            return Err(AgentError::InvalidRequest(
                "Message must not be empty".to_string(),
            ));
        }

        let started = Instant::now();
        let system_prompt = self.get_system_prompt()?;
        let declarations: Vec<ToolDeclaration> = tools.iter().map(ToolDeclaration::from).collect();

        let mut messages = history.to_vec();
        messages.push(Message::user_text(user_text));

        let mut debug_log = DebugLog::new();
        let mut token_usage = Usage::default();
        let mut tool_calls = Vec::new();
        let mut rounds = 0;
        let mut last_text = String::new();

        loop {
            if let Some(max_rounds) = self.config.max_rounds {
                if rounds >= max_rounds {
                    warn!(rounds, "round limit reached before the engine finished");
                    return Ok(RunOutcome {
                        status: RunStatus::RoundLimitExceeded { rounds },
                        final_text: last_text,
                        tool_calls,
                        debug_log,
                        token_usage,
                        rounds,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
            rounds += 1;

            debug_log.record_request(json!({
                "system": system_prompt,
                "tools": declarations,
                "messages": messages,
            }));
            debug!(round = rounds, messages = messages.len(), "sending request");

            let sent = Instant::now();
            let response = self
                .provider
                .complete(&system_prompt, &messages, &declarations)
                .await?;
            token_usage += response.usage;
            debug_log.record_response(
                serde_json::to_value(&response)?,
                sent.elapsed().as_millis() as u64,
                token_usage,
            );

            last_text = join_text(&response.content);

            if !response.has_tool_use() {
                info!(
                    rounds,
                    input_tokens = token_usage.input_tokens,
                    output_tokens = token_usage.output_tokens,
                    "run completed"
                );
                return Ok(RunOutcome {
                    status: RunStatus::Completed,
                    final_text: last_text,
                    tool_calls,
                    debug_log,
                    token_usage,
                    rounds,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }

            if !last_text.is_empty() {
                emit(
                    progress,
                    ProgressEvent::Thinking {
                        text: last_text.clone(),
                    },
                );
            }

            let results = self
                .execute_tools(&response.content, invoker, &mut tool_calls, progress)
                .await;

            messages.push(Message::new(
                Role::Assistant,
                MessageContent::Blocks(response.content),
            ));
            messages.push(Message::new(Role::User, MessageContent::Blocks(results)));
        }
    }
}
