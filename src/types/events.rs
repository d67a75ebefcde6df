//! Canonical streaming events

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Add, AddAssign};

/// Kind of a content part addressed by a part index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartKind {
    Text,
    Thinking,
    ToolCall,
}

/// The model's stated reason for ending a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    FunctionCall,
    Cancelled,
    Error,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::FunctionCall => "function_call",
            FinishReason::Cancelled => "cancelled",
            FinishReason::Error => "error",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage. Accumulates additively across completed turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(rename = "in")]
    pub input: u64,
    #[serde(rename = "out")]
    pub output: u64,
}

impl Usage {
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }

    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input: self.input + rhs.input,
            output: self.output + rhs.output,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        self.input += rhs.input;
        self.output += rhs.output;
    }
}

/// Canonical, provider-independent streaming event for one turn.
///
/// `index` is the turn-local part index assigned by the adapter. Every `*-start`
/// precedes the part's deltas, which precede its `*-complete`, and an index is
/// never reused within a turn. The accumulator maps local indices onto the
/// run-global index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// Turn started
    Start,

    TextStart {
        index: u32,
    },
    TextDelta {
        index: u32,
        delta: String,
    },
    TextComplete {
        index: u32,
    },

    /// `redacted` marks an opaque (encrypted) reasoning trace
    ThinkingStart {
        index: u32,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        redacted: bool,
    },
    ThinkingDelta {
        index: u32,
        delta: String,
    },
    ThinkingComplete {
        index: u32,
    },

    ToolCallStart {
        index: u32,
        id: String,
        name: String,
    },
    /// Arguments are only released once the vendor signals the call is complete
    /// and the buffered fragments parse as a JSON object.
    ToolCallComplete {
        index: u32,
        parameters: Map<String, Value>,
    },

    /// Terminal: turn finished
    Complete {
        finish_reason: FinishReason,
        usage: Usage,
    },

    /// Terminal: turn failed
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl StreamEvent {
    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
            code: None,
        }
    }

    /// Local part index, for part-scoped events.
    pub fn index(&self) -> Option<u32> {
        match self {
            StreamEvent::TextStart { index }
            | StreamEvent::TextDelta { index, .. }
            | StreamEvent::TextComplete { index }
            | StreamEvent::ThinkingStart { index, .. }
            | StreamEvent::ThinkingDelta { index, .. }
            | StreamEvent::ThinkingComplete { index }
            | StreamEvent::ToolCallStart { index, .. }
            | StreamEvent::ToolCallComplete { index, .. } => Some(*index),
            StreamEvent::Start | StreamEvent::Complete { .. } | StreamEvent::Error { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<PartKind> {
        match self {
            StreamEvent::TextStart { .. }
            | StreamEvent::TextDelta { .. }
            | StreamEvent::TextComplete { .. } => Some(PartKind::Text),
            StreamEvent::ThinkingStart { .. }
            | StreamEvent::ThinkingDelta { .. }
            | StreamEvent::ThinkingComplete { .. } => Some(PartKind::Thinking),
            StreamEvent::ToolCallStart { .. } | StreamEvent::ToolCallComplete { .. } => {
                Some(PartKind::ToolCall)
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_with_kebab_case_tags() {
        let ev = StreamEvent::TextDelta {
            index: 0,
            delta: "Hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({"type": "text-delta", "index": 0, "delta": "Hello"})
        );

        let done = StreamEvent::Complete {
            finish_reason: FinishReason::FunctionCall,
            usage: Usage::new(10, 20),
        };
        assert_eq!(
            serde_json::to_value(&done).unwrap(),
            json!({"type": "complete", "finish_reason": "function_call", "usage": {"in": 10, "out": 20}})
        );
    }

    #[test]
    fn redacted_flag_is_optional_on_the_wire() {
        let ev: StreamEvent =
            serde_json::from_value(json!({"type": "thinking-start", "index": 2})).unwrap();
        assert_eq!(
            ev,
            StreamEvent::ThinkingStart {
                index: 2,
                redacted: false
            }
        );
        assert_eq!(ev.kind(), Some(PartKind::Thinking));
        assert_eq!(ev.index(), Some(2));
    }

    #[test]
    fn usage_adds_fieldwise() {
        let total = Usage::new(10, 20) + Usage::new(1, 2);
        assert_eq!(total, Usage::new(11, 22));
        assert_eq!(total.total(), 33);
    }
}
