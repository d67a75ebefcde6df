//! Event mapping (vendor chunk -> canonical StreamEvent)
//!
//! Each vendor gets a [`StreamAdapter`]: a closed chunk type plus a per-turn state
//! machine. Adapters do not track indices or open parts themselves; they drive an
//! [`EventEmitter`], which owns those rules for every vendor:
//! - the turn-start event is emitted exactly once
//! - at most one part is open; opening another kind closes the current one first
//! - consecutive deltas of one kind collapse into a single part
//! - tool-call arguments are buffered per vendor index and parsed on close;
//!   unusable arguments become an `error` event

use crate::types::events::{FinishReason, StreamEvent, Usage};
use crate::types::message::ContentPart;
use crate::types::result::TurnResult;
use crate::utils::ToolCallAssembler;
use crate::BoxStream;
use futures::{stream, StreamExt};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Translates one vendor's incremental wire representation into canonical events
/// for exactly one turn.
pub trait StreamAdapter: Send {
    type Chunk: Send;

    /// Some chunks (argument fragments) yield no events and only update buffers.
    fn handle(&mut self, chunk: Self::Chunk) -> Vec<StreamEvent>;

    /// Called once when the vendor stream ends. Emits nothing if the vendor never
    /// signalled completion, so the consumer can report an incomplete stream.
    fn finish(&mut self) -> Vec<StreamEvent> {
        Vec::new()
    }
}

/// Map a stream of vendor chunks through `adapter`.
///
/// State lives inside the returned stream, so one adapter serves one turn.
/// Errors from the chunk stream are passed through and end the stream.
pub fn adapt_stream<A>(
    chunks: BoxStream<'static, A::Chunk>,
    adapter: A,
) -> BoxStream<'static, StreamEvent>
where
    A: StreamAdapter + 'static,
    A::Chunk: 'static,
{
    let mapped = stream::unfold(
        (chunks, adapter, VecDeque::<StreamEvent>::new(), false),
        |(mut input, mut adapter, mut q, mut ended)| async move {
            loop {
                if let Some(ev) = q.pop_front() {
                    return Some((Ok(ev), (input, adapter, q, ended)));
                }
                if ended {
                    return None;
                }

                match input.next().await {
                    Some(Ok(chunk)) => q.extend(adapter.handle(chunk)),
                    Some(Err(e)) => {
                        ended = true;
                        return Some((Err(e), (input, adapter, q, ended)));
                    }
                    None => {
                        ended = true;
                        q.extend(adapter.finish());
                    }
                }
            }
        },
    );

    Box::pin(mapped)
}

/// Replay a one-shot turn result as the canonical events a stream would carry.
pub fn replay_turn(result: TurnResult) -> Vec<StreamEvent> {
    let mut out = vec![StreamEvent::Start];
    match result {
        TurnResult::Error { error } => out.push(StreamEvent::error(error)),
        TurnResult::Success {
            message,
            finish_reason,
            usage,
        } => {
            for (i, part) in message.parts().iter().enumerate() {
                let index = i as u32;
                match part {
                    ContentPart::Text { text } => {
                        out.push(StreamEvent::TextStart { index });
                        if !text.is_empty() {
                            out.push(StreamEvent::TextDelta {
                                index,
                                delta: text.clone(),
                            });
                        }
                        out.push(StreamEvent::TextComplete { index });
                    }
                    ContentPart::Thinking { thinking, redacted } => {
                        out.push(StreamEvent::ThinkingStart {
                            index,
                            redacted: *redacted,
                        });
                        if !thinking.is_empty() {
                            out.push(StreamEvent::ThinkingDelta {
                                index,
                                delta: thinking.clone(),
                            });
                        }
                        out.push(StreamEvent::ThinkingComplete { index });
                    }
                    ContentPart::ToolCall {
                        id,
                        name,
                        parameters,
                    } => {
                        out.push(StreamEvent::ToolCallStart {
                            index,
                            id: id.clone(),
                            name: name.clone(),
                        });
                        out.push(StreamEvent::ToolCallComplete {
                            index,
                            parameters: parameters.clone(),
                        });
                    }
                }
            }
            out.push(StreamEvent::Complete {
                finish_reason,
                usage,
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenPart {
    Text(u32),
    Thinking(u32),
    ToolCall { index: u32, key: u32, announced: bool },
}

/// Shared per-turn normalizer driven by vendor adapters.
#[derive(Debug, Default)]
pub struct EventEmitter {
    started: bool,
    finished: bool,
    next_index: u32,
    open: Option<OpenPart>,
    tool_calls: ToolCallAssembler,
    out: Vec<StreamEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A terminal event has been emitted; everything after is ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn has_open_part(&self) -> bool {
        self.open.is_some()
    }

    /// Drain the events produced since the last call.
    pub fn take(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.out)
    }

    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            self.out.push(StreamEvent::Start);
        }
    }

    fn alloc(&mut self) -> u32 {
        let i = self.next_index;
        self.next_index += 1;
        i
    }

    /// Close whatever is open and report whether the turn is still live.
    fn switch(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.start();
        self.close_open();
        !self.finished
    }

    pub fn open_text(&mut self) {
        if !self.switch() {
            return;
        }
        let index = self.alloc();
        self.out.push(StreamEvent::TextStart { index });
        self.open = Some(OpenPart::Text(index));
    }

    pub fn text_delta(&mut self, delta: &str) {
        if self.finished || delta.is_empty() {
            return;
        }
        if !matches!(self.open, Some(OpenPart::Text(_))) {
            self.open_text();
        }
        if let Some(OpenPart::Text(index)) = self.open {
            self.out.push(StreamEvent::TextDelta {
                index,
                delta: delta.to_string(),
            });
        }
    }

    pub fn open_thinking(&mut self, redacted: bool) {
        if !self.switch() {
            return;
        }
        let index = self.alloc();
        self.out.push(StreamEvent::ThinkingStart { index, redacted });
        self.open = Some(OpenPart::Thinking(index));
    }

    pub fn thinking_delta(&mut self, delta: &str) {
        if self.finished || delta.is_empty() {
            return;
        }
        if !matches!(self.open, Some(OpenPart::Thinking(_))) {
            self.open_thinking(false);
        }
        if let Some(OpenPart::Thinking(index)) = self.open {
            self.out.push(StreamEvent::ThinkingDelta {
                index,
                delta: delta.to_string(),
            });
        }
    }

    /// Open (or update) the tool call at vendor index `key`.
    ///
    /// `tool-call-start` is emitted as soon as the name is known.
    pub fn open_tool_call(&mut self, key: u32, id: Option<String>, name: Option<String>) {
        if self.finished {
            return;
        }
        let same = matches!(self.open, Some(OpenPart::ToolCall { key: k, .. }) if k == key);
        if !same {
            if !self.switch() {
                return;
            }
            let index = self.alloc();
            self.open = Some(OpenPart::ToolCall {
                index,
                key,
                announced: false,
            });
        }
        self.tool_calls.on_started(key, id, name);
        self.announce_tool_call();
    }

    /// Seed arguments known up front (used when no fragment follows).
    pub fn tool_seed(&mut self, key: u32, seed: Map<String, Value>) {
        if !self.finished && !seed.is_empty() {
            self.tool_calls.on_seed(key, seed);
        }
    }

    /// Buffer an argument fragment. Never emits a delta.
    pub fn tool_arguments(&mut self, key: u32, fragment: &str) {
        if self.finished {
            return;
        }
        if !matches!(self.open, Some(OpenPart::ToolCall { key: k, .. }) if k == key) {
            self.open_tool_call(key, None, None);
            if self.finished {
                return;
            }
        }
        trace!(key, len = fragment.len(), "buffered tool-call argument fragment");
        self.tool_calls.on_partial(key, fragment);
    }

    fn announce_tool_call(&mut self) {
        let Some(OpenPart::ToolCall {
            index,
            key,
            announced: false,
        }) = self.open
        else {
            return;
        };
        let Some(name) = self.tool_calls.name(key).map(str::to_string) else {
            return;
        };
        let id = match self.tool_calls.id(key) {
            Some(id) => id.to_string(),
            None => {
                let generated = format!("call_{}", uuid::Uuid::new_v4().simple());
                self.tool_calls
                    .on_started(key, Some(generated.clone()), None);
                generated
            }
        };
        self.out.push(StreamEvent::ToolCallStart { index, id, name });
        self.open = Some(OpenPart::ToolCall {
            index,
            key,
            announced: true,
        });
    }

    /// Close the open part, if any. Closing a tool call parses its arguments.
    pub fn close_open(&mut self) {
        match self.open.take() {
            None => {}
            Some(OpenPart::Text(index)) => self.out.push(StreamEvent::TextComplete { index }),
            Some(OpenPart::Thinking(index)) => {
                self.out.push(StreamEvent::ThinkingComplete { index })
            }
            Some(OpenPart::ToolCall {
                index,
                key,
                announced,
            }) => match self.tool_calls.finalize(key) {
                Ok(call) => {
                    if !announced {
                        self.out.push(StreamEvent::ToolCallStart {
                            index,
                            id: call.id,
                            name: call.name,
                        });
                    }
                    self.out.push(StreamEvent::ToolCallComplete {
                        index,
                        parameters: call.parameters,
                    });
                }
                Err(message) => {
                    debug!(index, key, %message, "rejecting tool-call arguments");
                    self.fail(message, Some("invalid_tool_arguments".to_string()));
                }
            },
        }
    }

    pub fn complete(&mut self, finish_reason: FinishReason, usage: Usage) {
        if !self.switch() {
            return;
        }
        self.finished = true;
        self.out.push(StreamEvent::Complete {
            finish_reason,
            usage,
        });
    }

    /// Emit a terminal `error`, discarding whatever is still open.
    pub fn fail(&mut self, message: impl Into<String>, code: Option<String>) {
        if self.finished {
            return;
        }
        self.start();
        self.open = None;
        self.finished = true;
        self.out.push(StreamEvent::Error {
            message: message.into(),
            code,
        });
    }
}
