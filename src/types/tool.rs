//! Tool calling definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool definition passed to the provider with every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the parameters object
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters: empty_object_schema(),
        }
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }
}

/// Tool call (invocation from model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub parameters: Map<String, Value>,
}

/// What a resolver produced for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolOutcome {
    Success { content: String },
    Error { error: String },
}

impl ToolOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        ToolOutcome::Success {
            content: content.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ToolOutcome::Error {
            error: error.into(),
        }
    }
}
