use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::drivers::{Provider, TurnRequest};
use crate::error::Error;
use crate::pipeline::accumulate::PartAccumulator;
use crate::telemetry::{NoopTracer, Span, SpanKind, SpanStatus, Tracer};
use crate::tools::ToolExecutor;
use crate::types::events::{FinishReason, Usage};
use crate::types::message::Message;
use crate::types::result::{RunError, RunResult};
use crate::Result;

use super::builder::RunRequest;
use super::config::RunnerConfig;
use super::execution::TurnOutcome;
use super::handle::{CancelHandle, RunHandle};

/// Drives runs against one provider.
///
/// A run alternates provider calls and tool rounds until the model stops, something
/// fails, the iteration bound is hit, or the caller cancels:
///
/// ```text
/// Requesting → Accumulating → Deciding ─┬─ FunctionCall → ExecutingTools → Requesting
///                                       ├─ Stop → Done(success)
///                                       ├─ Length / error / bound → Done(error)
///                                       └─ cancel → Done(cancelled)
/// ```
#[derive(Clone)]
pub struct Runner {
    pub(crate) provider: Arc<dyn Provider>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::with_config(provider, RunnerConfig::default())
    }

    pub fn with_config(provider: Arc<dyn Provider>, config: RunnerConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Spawn the run on the current tokio runtime.
    pub fn start(&self, request: RunRequest) -> RunHandle {
        let cancel = CancelHandle::new();
        let runner = self.clone();
        let run_cancel = cancel.clone();
        let task = tokio::spawn(async move { runner.run(request, &run_cancel).await });
        RunHandle::new(cancel, task)
    }

    /// Drive a run to completion on the current task.
    ///
    /// Model, tool, bound and cancellation outcomes are all `Ok(RunResult)`. `Err` means
    /// the provider or an adapter failed; the run's open spans are then left un-ended.
    pub async fn run(&self, request: RunRequest, cancel: &CancelHandle) -> Result<RunResult> {
        let RunRequest {
            messages,
            tools,
            options,
            resolver,
            max_iterations,
            stream,
            tracer,
            observer,
        } = request;

        let max_iterations = max_iterations.or(self.config.max_iterations);
        let streaming = stream.unwrap_or(self.config.stream);
        if streaming && !self.provider.supports_streaming() {
            return Err(Error::StreamingUnsupported {
                provider: self.provider.provider_id().to_string(),
            });
        }

        let tracer: Arc<dyn Tracer> = tracer.unwrap_or_else(|| Arc::new(NoopTracer));
        let root = tracer.start_span("run", SpanKind::Run);
        let executor = ToolExecutor::new(resolver);
        let mut acc = match observer {
            Some(observer) => PartAccumulator::with_observer(observer),
            None => PartAccumulator::new(),
        };

        let mut conversation = messages;
        let first_new = conversation.len();
        let mut usage = Usage::default();
        let mut iteration: u32 = 0;

        info!(
            provider = self.provider.provider_id(),
            streaming,
            max_iterations = ?max_iterations,
            tools = tools.len(),
            "run started"
        );

        let result = loop {
            if let Some(limit) = max_iterations {
                if iteration >= limit {
                    break RunResult::Error {
                        error: RunError::max_iterations(limit),
                        messages: conversation.split_off(first_new),
                        usage,
                    };
                }
            }
            if cancel.is_cancelled() {
                break RunResult::Cancelled {
                    partial: None,
                    messages: conversation.split_off(first_new),
                    usage,
                };
            }

            iteration += 1;
            acc.begin_turn();
            debug!(turn = iteration, "requesting provider");
            let span = root.start_span(&format!("turn {iteration}"), SpanKind::Llm);
            let request = TurnRequest {
                messages: &conversation,
                tools: &tools,
                options: &options,
            };
            let outcome = self
                .execute_turn(request, streaming, &mut acc, cancel)
                .await?;

            let output = match outcome {
                TurnOutcome::Complete(output) => output,
                TurnOutcome::Cancelled => {
                    span.set_result(json!({ "finish_reason": FinishReason::Cancelled }));
                    span.end(SpanStatus::Ok);
                    break RunResult::Cancelled {
                        partial: acc.partial(),
                        messages: conversation.split_off(first_new),
                        usage,
                    };
                }
                TurnOutcome::Failed { message, code } => {
                    debug!(turn = iteration, %message, code = ?code, "provider reported an error");
                    span.set_result(json!({ "error": message, "code": code }));
                    span.end(SpanStatus::Error);
                    break RunResult::Error {
                        error: RunError::model(message),
                        messages: conversation.split_off(first_new),
                        usage,
                    };
                }
                TurnOutcome::Incomplete => {
                    let error = RunError::incomplete_stream();
                    span.set_result(json!({ "error": error.message }));
                    span.end(SpanStatus::Error);
                    break RunResult::Error {
                        error,
                        messages: conversation.split_off(first_new),
                        usage,
                    };
                }
            };

            let finish_reason = output.finish_reason;
            debug!(turn = iteration, %finish_reason, usage = ?output.usage, "turn completed");
            span.set_result(json!({
                "finish_reason": finish_reason,
                "usage": output.usage,
            }));
            conversation.push(output.message.clone());
            usage += output.usage;

            match finish_reason {
                FinishReason::Stop => {
                    span.end(SpanStatus::Ok);
                    break success(&mut conversation, first_new, output.message, usage);
                }
                FinishReason::Length if self.config.accept_truncated => {
                    debug!(turn = iteration, "accepting truncated output");
                    span.end(SpanStatus::Ok);
                    break success(&mut conversation, first_new, output.message, usage);
                }
                FinishReason::Length => {
                    span.end(SpanStatus::Error);
                    break RunResult::Error {
                        error: RunError::model("incomplete output: the response hit the length limit"),
                        messages: conversation.split_off(first_new),
                        usage,
                    };
                }
                FinishReason::FunctionCall => {
                    span.end(SpanStatus::Ok);
                    let calls = output.message.tool_calls();
                    if calls.is_empty() {
                        warn!(turn = iteration, "function-call finish without tool calls; ending run");
                        break success(&mut conversation, first_new, output.message, usage);
                    }

                    debug!(turn = iteration, tool_calls = calls.len(), "executing tool calls");
                    let round = executor
                        .execute_all(&calls, root.as_ref(), cancel.token())
                        .await;
                    conversation.push(Message::tool(round.results));
                    if round.cancelled {
                        break RunResult::Cancelled {
                            partial: None,
                            messages: conversation.split_off(first_new),
                            usage,
                        };
                    }
                }
                FinishReason::Cancelled | FinishReason::Error => {
                    span.end(SpanStatus::Error);
                    break RunResult::Error {
                        error: RunError::model(format!("unexpected finish reason `{finish_reason}`")),
                        messages: conversation.split_off(first_new),
                        usage,
                    };
                }
            }
        };

        finish_root(root.as_ref(), &result, iteration);
        Ok(result)
    }
}

fn success(
    conversation: &mut Vec<Message>,
    first_new: usize,
    message: Message,
    usage: Usage,
) -> RunResult {
    RunResult::Success {
        messages: conversation.split_off(first_new),
        message,
        usage,
    }
}

fn finish_root(root: &dyn Span, result: &RunResult, turns: u32) {
    let usage = result.usage();
    root.set_result(json!({
        "result": result.status(),
        "turns": turns,
        "usage": usage,
        "error": result.error().map(|e| e.to_string()),
    }));
    match result.error() {
        Some(error) => {
            info!(turns, kind = %error.kind, error = %error.message, "run ended with an error");
            root.end(SpanStatus::Error);
        }
        None => {
            info!(turns, status = result.status(), input_tokens = usage.input, output_tokens = usage.output, "run finished");
            root.end(SpanStatus::Ok);
        }
    }
}
