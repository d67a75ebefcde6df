//! # Types Module
//!
//! Core type system shared by every other module: the conversation model the
//! orchestrator appends to, the canonical streaming events adapters produce, and the
//! structured outcomes of turns and runs.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | User, assistant or tool message |
//! | [`ContentPart`] | Text, thinking or tool-call unit of assistant output |
//! | [`ToolResult`] | Outcome of one tool call, fed back in a tool message |
//! | [`StreamEvent`] | Canonical, provider-independent streaming event |
//! | [`FinishReason`] | Why the model ended a turn |
//! | [`Usage`] | Token usage, additive across turns |
//! | [`TurnResult`] | Outcome of one exchange |
//! | [`RunResult`] | Final outcome of a run |
//!
//! ## Example
//!
//! ```rust
//! use ai_turn_runtime::types::{ContentPart, Message, Usage};
//!
//! let user = Message::user("What's the weather?");
//! let reply = Message::assistant(vec![ContentPart::text("Sunny.")]);
//! assert_eq!(reply.text(), "Sunny.");
//!
//! let mut total = Usage::new(10, 20);
//! total += Usage::new(5, 5);
//! assert_eq!(total, Usage::new(15, 25));
//! # let _ = user;
//! ```

pub mod events;
pub mod message;
pub mod result;
pub mod tool;

pub use events::{FinishReason, PartKind, StreamEvent, Usage};
pub use message::{ContentPart, Message, MessageRole, ToolResult};
pub use result::{RunError, RunErrorKind, RunResult, TurnResult};
pub use tool::{ToolCall, ToolDefinition, ToolOutcome};
