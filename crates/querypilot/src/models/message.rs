use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// A single block inside a message
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Any block type not listed above, such as `thinking`, kept as received
    /// so it can be sent back unchanged
    #[serde(untagged)]
    Other(Value),
}

/// A tool use block borrowed out of a message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolUse<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Map<String, Value>,
}

impl ContentBlock {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        input: Map<String, Value>,
    ) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result<I: Into<String>, C: Into<String>>(tool_use_id: I, content: C) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn tool_error<I: Into<String>, C: Into<String>>(tool_use_id: I, content: C) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Get the text if this is a Text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<ToolUse<'_>> {
        match self {
            ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<(&str, &str)> {
        match self {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => Some((tool_use_id, content)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// Either a plain string or an ordered list of blocks. The order of blocks is
/// significant: it pairs tool uses with their results.
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// The content as an owned list of blocks
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match self {
            MessageContent::Text(text) => vec![ContentBlock::text(text.clone())],
            MessageContent::Blocks(blocks) => blocks.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from the reasoning engine
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self { role, content }
    }

    /// Create an empty user message
    pub fn user() -> Self {
        Self::new(Role::User, MessageContent::Blocks(Vec::new()))
    }

    /// Create an empty assistant message
    pub fn assistant() -> Self {
        Self::new(Role::Assistant, MessageContent::Blocks(Vec::new()))
    }

    /// A user message carrying plain text content
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    /// Add a block to the message, converting plain text content to blocks first
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        match &mut self.content {
            MessageContent::Blocks(blocks) => blocks.push(block),
            MessageContent::Text(text) => {
                let existing = ContentBlock::text(std::mem::take(text));
                self.content = MessageContent::Blocks(vec![existing, block]);
            }
        }
        self
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_block(ContentBlock::text(text))
    }

    pub fn with_tool_use<I: Into<String>, N: Into<String>>(
        self,
        id: I,
        name: N,
        input: Map<String, Value>,
    ) -> Self {
        self.with_block(ContentBlock::tool_use(id, name, input))
    }

    pub fn with_tool_result<I: Into<String>, C: Into<String>>(self, id: I, content: C) -> Self {
        self.with_block(ContentBlock::tool_result(id, content))
    }

    /// All text in the message joined by newlines
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => join_text(blocks),
        }
    }
}

/// Concatenate every text block, in order, separated by newlines
pub fn join_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(ContentBlock::as_text)
        .collect::<Vec<_>>()
        .join("\n")
}
