use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool advertised by the tool gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// The name of the tool, unique within a session
    pub name: String,
    /// A human description of what the tool does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Structural description of the accepted arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: Some(description.into()),
            input_schema: Some(input_schema),
        }
    }
}

/// A tool as declared to the reasoning engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<&Tool> for ToolDeclaration {
    fn from(tool: &Tool) -> Self {
        ToolDeclaration {
            name: tool.name.clone(),
            description: tool
                .description
                .clone()
                .unwrap_or_else(|| format!("Tool: {}", tool.name)),
            input_schema: tool
                .input_schema
                .clone()
                .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
        }
    }
}
