//! OpenAI Chat Completions adapter.
//!
//! Streaming chunks carry `choices[0].delta` with any of `content`,
//! `reasoning_content` (OpenAI-compatible reasoning models) and `tool_calls[]`
//! fragments keyed by `index`. The id and name of a tool call arrive in its first
//! fragment; later fragments only carry argument text.
//!
//! Usage is reported in a trailing chunk with empty `choices` when the request sets
//! `stream_options.include_usage`, so the `complete` event is held back until usage
//! shows up or the stream ends.

use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::pipeline::event_map::{adapt_stream, EventEmitter, StreamAdapter};
use crate::pipeline::PipelineError;
use crate::types::events::{FinishReason, StreamEvent, Usage};
use crate::types::message::{ContentPart, Message};
use crate::types::result::TurnResult;
use crate::utils::ToolCallAssembler;
use crate::BoxStream;

/// One decoded `data:` payload of an OpenAI stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OpenAiChunk {
    Error { error: OpenAiErrorBody },
    Delta(ChatCompletionChunk),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiErrorBody {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl OpenAiErrorBody {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => self.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl From<OpenAiUsage> for Usage {
    fn from(u: OpenAiUsage) -> Self {
        Usage::new(u.prompt_tokens, u.completion_tokens)
    }
}

/// Map an OpenAI `finish_reason`.
pub fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::FunctionCall,
        "content_filter" => FinishReason::Error,
        other => {
            warn!(finish_reason = other, "unknown OpenAI finish reason");
            FinishReason::Error
        }
    }
}

/// Decode one SSE `data:` payload. `[DONE]` and blank payloads yield `None`.
pub fn parse_chunk(data: &str) -> Result<Option<OpenAiChunk>, PipelineError> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    serde_json::from_str(data)
        .map(Some)
        .map_err(|e| PipelineError::Decoder(format!("invalid OpenAI stream chunk: {e}")))
}

/// Per-turn state machine for OpenAI streaming chunks.
#[derive(Debug, Default)]
pub struct OpenAiAdapter {
    emitter: EventEmitter,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn on_choice(&mut self, choice: ChunkChoice) {
        let delta = choice.delta;
        if let Some(reasoning) = delta.reasoning_content.as_deref() {
            self.emitter.thinking_delta(reasoning);
        }
        if let Some(content) = delta.content.as_deref() {
            self.emitter.text_delta(content);
        }
        for call in delta.tool_calls {
            let (name, arguments) = match call.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            if call.id.is_some() || name.is_some() {
                self.emitter.open_tool_call(call.index, call.id, name);
            }
            if let Some(arguments) = arguments.as_deref() {
                self.emitter.tool_arguments(call.index, arguments);
            }
        }
        if let Some(reason) = choice.finish_reason.as_deref() {
            let mapped = map_finish_reason(reason);
            debug!(finish_reason = reason, mapped = %mapped, "OpenAI turn finished");
            self.finish_reason = Some(mapped);
        }
    }
}

impl StreamAdapter for OpenAiAdapter {
    type Chunk = OpenAiChunk;

    fn handle(&mut self, chunk: OpenAiChunk) -> Vec<StreamEvent> {
        if self.emitter.is_finished() {
            return Vec::new();
        }
        self.emitter.start();
        match chunk {
            OpenAiChunk::Error { error } => {
                let code = error.code();
                self.emitter.fail(error.message, code);
            }
            OpenAiChunk::Delta(chunk) => {
                if let Some(usage) = chunk.usage {
                    self.usage = Some(usage.into());
                }
                if let Some(choice) = chunk.choices.into_iter().next() {
                    self.on_choice(choice);
                }
                if let (Some(reason), Some(usage)) = (self.finish_reason, self.usage) {
                    self.emitter.complete(reason, usage);
                }
            }
        }
        self.emitter.take()
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        if let Some(reason) = self.finish_reason.take() {
            self.emitter
                .complete(reason, self.usage.unwrap_or_default());
        }
        self.emitter.take()
    }
}

/// Canonical events from a stream of raw SSE `data:` payloads.
pub fn stream_events(frames: BoxStream<'static, String>) -> BoxStream<'static, StreamEvent> {
    let chunks = frames.filter_map(|frame| async move {
        match frame {
            Ok(data) => parse_chunk(&data).map_err(Error::from).transpose(),
            Err(e) => Some(Err(e)),
        }
    });
    adapt_stream(Box::pin(chunks), OpenAiAdapter::new())
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<CompletionToolCall>,
}

#[derive(Debug, Deserialize)]
struct CompletionToolCall {
    #[serde(default)]
    id: Option<String>,
    function: FunctionDelta,
}

/// Parse a non-streaming Chat Completions response body.
pub fn parse_response(body: &Value) -> TurnResult {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("provider returned an error")
            .to_string();
        return TurnResult::Error { error: message };
    }

    let completion = match ChatCompletion::deserialize(body) {
        Ok(c) => c,
        Err(e) => {
            return TurnResult::Error {
                error: format!("invalid OpenAI response: {e}"),
            }
        }
    };
    let usage = completion.usage.map(Usage::from).unwrap_or_default();
    let Some(choice) = completion.choices.into_iter().next() else {
        return TurnResult::Error {
            error: "OpenAI response has no choices".to_string(),
        };
    };

    let mut parts = Vec::new();
    if let Some(reasoning) = choice.message.reasoning_content.filter(|s| !s.is_empty()) {
        parts.push(ContentPart::thinking(reasoning));
    }
    if let Some(content) = choice.message.content.filter(|s| !s.is_empty()) {
        parts.push(ContentPart::text(content));
    }

    let mut assembler = ToolCallAssembler::new();
    for (i, call) in choice.message.tool_calls.into_iter().enumerate() {
        let key = i as u32;
        assembler.on_started(key, call.id, call.function.name);
        if let Some(arguments) = call.function.arguments.as_deref() {
            assembler.on_partial(key, arguments);
        }
        match assembler.finalize(key) {
            Ok(call) => parts.push(ContentPart::tool_call(call.id, call.name, call.parameters)),
            Err(error) => return TurnResult::Error { error },
        }
    }

    let finish_reason = choice
        .finish_reason
        .as_deref()
        .map(map_finish_reason)
        .unwrap_or(FinishReason::Stop);

    TurnResult::Success {
        message: Message::assistant(parts),
        finish_reason,
        usage,
    }
}
