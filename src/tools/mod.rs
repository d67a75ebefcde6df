//! # Tools
//!
//! Resolution of the tool calls a model requests.
//!
//! A turn's tool calls run one after another in the order the model emitted them, so
//! results and spans line up with the calls. Every call ends as a [`ToolResult`]; a
//! failing tool is reported back to the model and never ends the run.
//!
//! | Resolver answer | Tool result |
//! |-----------------|-------------|
//! | `Ok(Some(ToolOutcome::Success))` | success with the payload |
//! | `Ok(Some(ToolOutcome::Error))` | error with the tool's message |
//! | `Ok(None)` | not-found error naming the tool |
//! | `Err(e)` | error with `e`'s message |

mod executor;
mod registry;

pub use executor::{ToolExecutor, ToolRound, CANCELLED_BEFORE_EXECUTION};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::types::tool::ToolOutcome;

/// Injected callback resolving one tool call.
///
/// `None` means the tool is unknown. `Err` is the "thrown" path: anything the
/// resolver could not handle itself.
#[async_trait]
pub trait ToolResolver: Send + Sync {
    async fn on_tool_call(
        &self,
        name: &str,
        parameters: &Map<String, Value>,
    ) -> anyhow::Result<Option<ToolOutcome>>;
}
