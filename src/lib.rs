//! # ai-turn-runtime
//!
//! Turn orchestration runtime for generative language-model services.
//!
//! Given a conversation history and a set of callable tools, the runtime conducts a
//! bounded sequence of request/response exchanges with a model provider, normalizes
//! every vendor's streaming wire format into one canonical event stream, executes the
//! tool calls the model asks for, and returns a consistent [`RunResult`]
//! (success, error, or cancelled) with accumulated usage and message history.
//!
//! ## Core Philosophy
//!
//! - **Canonical events**: every vendor stream is normalized into strictly indexed
//!   [`StreamEvent`]s before anything else looks at it
//! - **Typed adapters**: each vendor is a closed chunk type plus a [`StreamAdapter`] state machine
//! - **Structured outcomes**: model and tool failures are data, infrastructure failures are errors
//! - **Cooperative cancellation**: checked between awaits, never preempting an in-flight call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ai_turn_runtime::drivers::Provider;
//! use ai_turn_runtime::tools::ToolRegistry;
//! use ai_turn_runtime::types::{Message, ToolDefinition, ToolOutcome};
//! use ai_turn_runtime::{RunRequest, RunResult, Runner};
//!
//! # async fn demo(provider: Arc<dyn Provider>) -> ai_turn_runtime::Result<()> {
//! let mut registry = ToolRegistry::new();
//! registry.register(
//!     ToolDefinition::new("web_search", "Search the web"),
//!     |params| async move {
//!         let q = params.get("q").and_then(|v| v.as_str()).unwrap_or_default();
//!         anyhow::Ok(ToolOutcome::success(format!("results for {q}")))
//!     },
//! );
//!
//! let request = RunRequest::new(vec![Message::user("What's new in Rust?")])
//!     .tools(registry.definitions())
//!     .resolver(Arc::new(registry))
//!     .max_iterations(8);
//!
//! let handle = Runner::new(provider).start(request);
//! match handle.wait().await? {
//!     RunResult::Success { message, usage, .. } => println!("{} ({usage:?})", message.text()),
//!     RunResult::Error { error, .. } => eprintln!("run failed: {error}"),
//!     RunResult::Cancelled { .. } => eprintln!("run cancelled"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Messages, content parts, canonical events, run/turn results |
//! | [`drivers`] | Provider capability trait and per-vendor stream adapters |
//! | [`pipeline`] | Adapter contract, stream mapping and the part accumulator |
//! | [`tools`] | Tool resolver contract, registry and sequential executor |
//! | [`runner`] | The turn orchestrator, run handles and configuration |
//! | [`batch`] | Bounded-concurrency execution of whole runs |
//! | [`telemetry`] | Tracer/span contract consumed by the orchestrator |

pub mod batch;
pub mod drivers;
pub mod pipeline;
pub mod runner;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use pipeline::accumulate::{PartAccumulator, PartObserver};
pub use pipeline::event_map::StreamAdapter;
pub use runner::{CancelHandle, RunHandle, RunRequest, Runner, RunnerConfig};
pub use types::{
    events::{FinishReason, PartKind, StreamEvent, Usage},
    message::{ContentPart, Message, MessageRole, ToolResult},
    result::{RunError, RunErrorKind, RunResult, TurnResult},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A specialized Result for pipeline operations
pub type PipeResult<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `PipeResult<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = PipeResult<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
