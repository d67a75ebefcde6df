//! Conversation messages and content parts

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::events::PartKind;
use super::tool::ToolCall;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

/// One message of a run's conversation. Append-only once added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User { content: Vec<ContentPart> },
    Assistant { content: Vec<ContentPart> },
    /// One result per tool call of the preceding assistant message, same order.
    Tool { content: Vec<ToolResult> },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User {
            content: vec![ContentPart::text(text)],
        }
    }

    pub fn assistant(parts: Vec<ContentPart>) -> Self {
        Message::Assistant { content: parts }
    }

    pub fn tool(results: Vec<ToolResult>) -> Self {
        Message::Tool { content: results }
    }

    pub fn role(&self) -> MessageRole {
        match self {
            Message::User { .. } => MessageRole::User,
            Message::Assistant { .. } => MessageRole::Assistant,
            Message::Tool { .. } => MessageRole::Tool,
        }
    }

    /// Content parts of a user or assistant message; empty for tool messages.
    pub fn parts(&self) -> &[ContentPart] {
        match self {
            Message::User { content } | Message::Assistant { content } => content,
            Message::Tool { .. } => &[],
        }
    }

    /// Tool results of a tool message; empty otherwise.
    pub fn tool_results(&self) -> &[ToolResult] {
        match self {
            Message::Tool { content } => content,
            _ => &[],
        }
    }

    /// Tool calls requested by this message, in emission order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.parts()
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolCall {
                    id,
                    name,
                    parameters,
                } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    parameters: parameters.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text parts (thinking excluded).
    pub fn text(&self) -> String {
        self.parts()
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// One unit of assistant output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        /// The reasoning trace is opaque (encrypted by the vendor)
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        redacted: bool,
    },
    ToolCall {
        id: String,
        name: String,
        parameters: Map<String, Value>,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn thinking(thinking: impl Into<String>) -> Self {
        ContentPart::Thinking {
            thinking: thinking.into(),
            redacted: false,
        }
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        parameters: Map<String, Value>,
    ) -> Self {
        ContentPart::ToolCall {
            id: id.into(),
            name: name.into(),
            parameters,
        }
    }

    pub fn kind(&self) -> PartKind {
        match self {
            ContentPart::Text { .. } => PartKind::Text,
            ContentPart::Thinking { .. } => PartKind::Thinking,
            ContentPart::ToolCall { .. } => PartKind::ToolCall,
        }
    }
}

/// Outcome of resolving one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Matches the id of the tool-call part it answers
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: true,
        }
    }
}
