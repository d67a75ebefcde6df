//! Anthropic Messages API adapter.
//!
//! Unlike OpenAI, Anthropic frames every content block explicitly
//! (`content_block_start` / `_delta` / `_stop`), so part boundaries come straight
//! from the wire. Differences handled here:
//! - `redacted_thinking` blocks carry an opaque payload instead of deltas.
//! - `signature_delta` belongs to the thinking block's integrity check and is ignored.
//! - `tool_use` input arrives as `input_json_delta` fragments; the block start may
//!   already carry a complete `input` object.
//! - usage is split: input tokens in `message_start`, output tokens in `message_delta`.

use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Error;
use crate::pipeline::event_map::{adapt_stream, EventEmitter, StreamAdapter};
use crate::pipeline::PipelineError;
use crate::types::events::{FinishReason, StreamEvent, Usage};
use crate::types::message::{ContentPart, Message};
use crate::types::result::TurnResult;
use crate::BoxStream;

/// One Anthropic server-sent event, discriminated by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: AnthropicErrorBody,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageStart {
    #[serde(default)]
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    RedactedThinking {
        #[serde(default)]
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Map<String, Value>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

/// Map an Anthropic `stop_reason`.
pub fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::FunctionCall,
        other => {
            warn!(stop_reason = other, "unhandled Anthropic stop reason");
            FinishReason::Error
        }
    }
}

/// Decode one SSE `data:` payload. Blank payloads yield `None`.
pub fn parse_chunk(data: &str) -> Result<Option<AnthropicEvent>, PipelineError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(data)
        .map(Some)
        .map_err(|e| PipelineError::Decoder(format!("invalid Anthropic stream event: {e}")))
}

/// Per-turn state machine for Anthropic stream events.
#[derive(Debug, Default)]
pub struct AnthropicAdapter {
    emitter: EventEmitter,
    stop_reason: Option<FinishReason>,
    usage: Usage,
}

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn merge_usage(&mut self, usage: AnthropicUsage) {
        if let Some(input) = usage.input_tokens {
            self.usage.input = input;
        }
        if let Some(output) = usage.output_tokens {
            self.usage.output = output;
        }
    }

    fn on_block_start(&mut self, index: u32, block: ContentBlock) {
        match block {
            ContentBlock::Text { text } => {
                self.emitter.open_text();
                self.emitter.text_delta(&text);
            }
            ContentBlock::Thinking { thinking } => {
                self.emitter.open_thinking(false);
                self.emitter.thinking_delta(&thinking);
            }
            ContentBlock::RedactedThinking { data } => {
                self.emitter.open_thinking(true);
                self.emitter.thinking_delta(&data);
            }
            ContentBlock::ToolUse { id, name, input } => {
                self.emitter.open_tool_call(index, Some(id), Some(name));
                self.emitter.tool_seed(index, input);
            }
            ContentBlock::Other => debug!(index, "skipping unknown content block"),
        }
    }

    fn on_block_delta(&mut self, index: u32, delta: BlockDelta) {
        match delta {
            BlockDelta::TextDelta { text } => self.emitter.text_delta(&text),
            BlockDelta::ThinkingDelta { thinking } => self.emitter.thinking_delta(&thinking),
            BlockDelta::InputJsonDelta { partial_json } => {
                self.emitter.tool_arguments(index, &partial_json)
            }
            BlockDelta::SignatureDelta { .. } | BlockDelta::Other => {}
        }
    }
}

impl StreamAdapter for AnthropicAdapter {
    type Chunk = AnthropicEvent;

    fn handle(&mut self, event: AnthropicEvent) -> Vec<StreamEvent> {
        if self.emitter.is_finished() {
            return Vec::new();
        }
        match event {
            AnthropicEvent::MessageStart { message } => {
                self.emitter.start();
                if let Some(usage) = message.usage {
                    self.merge_usage(usage);
                }
            }
            AnthropicEvent::ContentBlockStart {
                index,
                content_block,
            } => self.on_block_start(index, content_block),
            AnthropicEvent::ContentBlockDelta { index, delta } => {
                self.on_block_delta(index, delta)
            }
            AnthropicEvent::ContentBlockStop { .. } => self.emitter.close_open(),
            AnthropicEvent::MessageDelta { delta, usage } => {
                if let Some(usage) = usage {
                    self.merge_usage(usage);
                }
                if let Some(reason) = delta.stop_reason.as_deref() {
                    self.stop_reason = Some(map_stop_reason(reason));
                }
            }
            AnthropicEvent::MessageStop => {
                let reason = self.stop_reason.take().unwrap_or(FinishReason::Stop);
                self.emitter.complete(reason, self.usage);
            }
            AnthropicEvent::Error { error } => {
                self.emitter.fail(error.message, error.kind);
            }
            AnthropicEvent::Ping | AnthropicEvent::Other => {}
        }
        self.emitter.take()
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        // `message_delta` already carried the stop reason; only `message_stop` went missing.
        if let Some(reason) = self.stop_reason.take() {
            self.emitter.complete(reason, self.usage);
        }
        self.emitter.take()
    }
}

/// Canonical events from a stream of raw SSE `data:` payloads.
pub fn stream_events(frames: BoxStream<'static, String>) -> BoxStream<'static, StreamEvent> {
    let events = frames.filter_map(|frame| async move {
        match frame {
            Ok(data) => parse_chunk(&data).map_err(Error::from).transpose(),
            Err(e) => Some(Err(e)),
        }
    });
    adapt_stream(Box::pin(events), AnthropicAdapter::new())
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

/// Parse a non-streaming Messages API response body.
pub fn parse_response(body: &Value) -> TurnResult {
    if body.get("type").and_then(Value::as_str) == Some("error") {
        let error = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("provider returned an error")
            .to_string();
        return TurnResult::Error { error };
    }

    let response = match MessageResponse::deserialize(body) {
        Ok(r) => r,
        Err(e) => {
            return TurnResult::Error {
                error: format!("invalid Anthropic response: {e}"),
            }
        }
    };

    let parts = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(ContentPart::text(text)),
            ContentBlock::Thinking { thinking } => Some(ContentPart::thinking(thinking)),
            ContentBlock::RedactedThinking { data } => Some(ContentPart::Thinking {
                thinking: data,
                redacted: true,
            }),
            ContentBlock::ToolUse { id, name, input } => {
                Some(ContentPart::tool_call(id, name, input))
            }
            ContentBlock::Other => None,
        })
        .collect();

    TurnResult::Success {
        message: Message::assistant(parts),
        finish_reason: response
            .stop_reason
            .as_deref()
            .map(map_stop_reason)
            .unwrap_or(FinishReason::Stop),
        usage: Usage::new(
            response.usage.input_tokens.unwrap_or(0),
            response.usage.output_tokens.unwrap_or(0),
        ),
    }
}
