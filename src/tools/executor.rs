use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ToolResolver;
use crate::telemetry::{Span, SpanKind, SpanStatus};
use crate::types::message::ToolResult;
use crate::types::tool::{ToolCall, ToolOutcome};

/// Content of the results given to calls skipped because the run was cancelled.
pub const CANCELLED_BEFORE_EXECUTION: &str = "cancelled before execution";

/// Results of one turn's tool calls, one per call in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRound {
    pub results: Vec<ToolResult>,
    /// Cancellation was observed before at least one call ran.
    pub cancelled: bool,
}

/// Runs a turn's tool calls sequentially through the resolver.
///
/// Without a resolver every call resolves as not found.
#[derive(Clone, Default)]
pub struct ToolExecutor {
    resolver: Option<Arc<dyn ToolResolver>>,
}

impl ToolExecutor {
    pub fn new(resolver: Option<Arc<dyn ToolResolver>>) -> Self {
        Self { resolver }
    }

    /// Resolve a single call. Never fails: every outcome becomes a [`ToolResult`].
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(resolver) = &self.resolver else {
            return not_found(call);
        };
        match resolver.on_tool_call(&call.name, &call.parameters).await {
            Ok(Some(ToolOutcome::Success { content })) => ToolResult::success(call, content),
            Ok(Some(ToolOutcome::Error { error })) => ToolResult::error(call, error),
            Ok(None) => not_found(call),
            Err(e) => {
                debug!(tool = %call.name, id = %call.id, error = %e, "tool resolver failed");
                ToolResult::error(call, format!("{e:#}"))
            }
        }
    }

    /// Resolve `calls` in order, each under its own child span of `parent`.
    ///
    /// `cancel` is checked before each call; once it fires, the remaining calls get
    /// error results instead of running.
    pub async fn execute_all(
        &self,
        calls: &[ToolCall],
        parent: &dyn Span,
        cancel: &CancellationToken,
    ) -> ToolRound {
        let mut results = Vec::with_capacity(calls.len());
        let mut cancelled = false;

        for call in calls {
            if cancelled || cancel.is_cancelled() {
                if !cancelled {
                    debug!(remaining = calls.len() - results.len(), "skipping tool calls after cancellation");
                }
                cancelled = true;
                results.push(ToolResult::error(call, CANCELLED_BEFORE_EXECUTION));
                continue;
            }

            let span = parent.start_span(&format!("tool {}", call.name), SpanKind::Tool);
            let result = self.execute(call).await;
            span.set_result(json!({
                "id": result.id,
                "content": result.content,
                "isError": result.is_error,
            }));
            span.end(if result.is_error {
                SpanStatus::Error
            } else {
                SpanStatus::Ok
            });
            results.push(result);
        }

        ToolRound { results, cancelled }
    }
}

fn not_found(call: &ToolCall) -> ToolResult {
    warn!(tool = %call.name, id = %call.id, "model requested an unknown tool");
    ToolResult::error(
        call,
        format!("not-found: no tool named `{}` is available", call.name),
    )
}
