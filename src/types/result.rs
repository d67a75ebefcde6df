//! Turn and run outcomes

use serde::{Deserialize, Serialize};

use super::events::{FinishReason, Usage};
use super::message::Message;

/// Category of a structured run failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorKind {
    /// Structured provider error, truncated output, or unexpected finish reason
    Model,
    /// Unresolved tool call. Normally turned into a tool result instead.
    Tool,
    /// Iteration bound exceeded
    MaxIterations,
    /// Stream ended without a terminal `complete`/`error` event
    IncompleteStream,
}

impl RunErrorKind {
    /// Stable code string for this kind.
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Tool => "tool",
            Self::MaxIterations => "max_iterations",
            Self::IncompleteStream => "incomplete_stream",
        }
    }
}

impl std::fmt::Display for RunErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Structured failure captured into [`RunResult::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct RunError {
    pub kind: RunErrorKind,
    pub message: String,
}

impl RunError {
    pub fn new(kind: RunErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::new(RunErrorKind::Model, message)
    }

    pub fn max_iterations(limit: u32) -> Self {
        Self::new(
            RunErrorKind::MaxIterations,
            format!("exceeded the iteration bound of {limit}"),
        )
    }

    pub fn incomplete_stream() -> Self {
        Self::new(
            RunErrorKind::IncompleteStream,
            "stream ended without a complete or error event",
        )
    }
}

/// Outcome of one request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TurnResult {
    Success {
        message: Message,
        finish_reason: FinishReason,
        usage: Usage,
    },
    Error {
        error: String,
    },
}

/// Final outcome of a run.
///
/// `messages` only holds what the run appended (assistant and tool messages of
/// completed turns); the initial history is not repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum RunResult {
    Success {
        messages: Vec<Message>,
        /// Final assistant message
        message: Message,
        usage: Usage,
    },
    Error {
        error: RunError,
        messages: Vec<Message>,
        usage: Usage,
    },
    Cancelled {
        /// Parts of the in-flight turn, present only if cancelled mid-turn
        partial: Option<Message>,
        messages: Vec<Message>,
        /// Completed turns only
        usage: Usage,
    },
}

impl RunResult {
    pub fn messages(&self) -> &[Message] {
        match self {
            RunResult::Success { messages, .. }
            | RunResult::Error { messages, .. }
            | RunResult::Cancelled { messages, .. } => messages,
        }
    }

    pub fn usage(&self) -> Usage {
        match self {
            RunResult::Success { usage, .. }
            | RunResult::Error { usage, .. }
            | RunResult::Cancelled { usage, .. } => *usage,
        }
    }

    pub fn error(&self) -> Option<&RunError> {
        match self {
            RunResult::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunResult::Cancelled { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            RunResult::Success { .. } => "success",
            RunResult::Error { .. } => "error",
            RunResult::Cancelled { .. } => "cancelled",
        }
    }
}
