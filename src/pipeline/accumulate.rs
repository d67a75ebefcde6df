use crate::pipeline::PipelineError;
use crate::types::events::{FinishReason, PartKind, StreamEvent, Usage};
use crate::types::message::{ContentPart, Message};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Part lifecycle callbacks, registered before consumption starts.
///
/// Indices are run-global: they keep increasing across turns and are never reused.
pub trait PartObserver: Send + Sync {
    fn on_part_start(&self, _index: u64, _kind: PartKind) {}

    /// `accumulated` is the part's full text so far, `delta` included.
    fn on_part_update(&self, _index: u64, _kind: PartKind, _delta: &str, _accumulated: &str) {}

    fn on_part_end(&self, _index: u64, _kind: PartKind, _value: &ContentPart) {}
}

/// Part lifecycle as a value, for channel-based consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum PartEvent {
    Start {
        index: u64,
        kind: PartKind,
    },
    Update {
        index: u64,
        kind: PartKind,
        delta: String,
        accumulated: String,
    },
    End {
        index: u64,
        kind: PartKind,
        value: ContentPart,
    },
}

/// Observer forwarding every callback into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<PartEvent>,
}

/// Create an observer and the receiving end of its events.
pub fn part_channel() -> (Arc<ChannelObserver>, mpsc::UnboundedReceiver<PartEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelObserver { tx }), rx)
}

impl PartObserver for ChannelObserver {
    fn on_part_start(&self, index: u64, kind: PartKind) {
        let _ = self.tx.send(PartEvent::Start { index, kind });
    }

    fn on_part_update(&self, index: u64, kind: PartKind, delta: &str, accumulated: &str) {
        let _ = self.tx.send(PartEvent::Update {
            index,
            kind,
            delta: delta.to_string(),
            accumulated: accumulated.to_string(),
        });
    }

    fn on_part_end(&self, index: u64, kind: PartKind, value: &ContentPart) {
        let _ = self.tx.send(PartEvent::End {
            index,
            kind,
            value: value.clone(),
        });
    }
}

/// A finished turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    pub message: Message,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// What one event did to the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Pending,
    Complete(TurnOutput),
    Failed {
        message: String,
        code: Option<String>,
    },
}

enum Buffer {
    Text(String),
    Thinking { text: String, redacted: bool },
    ToolCall { id: String, name: String },
}

impl Buffer {
    fn kind(&self) -> PartKind {
        match self {
            Buffer::Text(_) => PartKind::Text,
            Buffer::Thinking { .. } => PartKind::Thinking,
            Buffer::ToolCall { .. } => PartKind::ToolCall,
        }
    }
}

struct OpenBuffer {
    global: u64,
    buffer: Buffer,
}

/// Builds the content parts of each turn from canonical events.
///
/// One accumulator is owned by one run. The global index counter is a field and
/// survives [`begin_turn`](Self::begin_turn); everything else is per turn.
pub struct PartAccumulator {
    next_index: u64,
    open: BTreeMap<u32, OpenBuffer>,
    seen: HashSet<u32>,
    completed: Vec<ContentPart>,
    observer: Option<Arc<dyn PartObserver>>,
}

impl Default for PartAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PartAccumulator {
    pub fn new() -> Self {
        Self {
            next_index: 0,
            open: BTreeMap::new(),
            seen: HashSet::new(),
            completed: Vec::new(),
            observer: None,
        }
    }

    pub fn with_observer(observer: Arc<dyn PartObserver>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::new()
        }
    }

    /// The global index the next part will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Reset per-turn state. The global index keeps counting.
    pub fn begin_turn(&mut self) {
        self.open.clear();
        self.seen.clear();
        self.completed.clear();
    }

    pub fn push(&mut self, event: StreamEvent) -> Result<Step, PipelineError> {
        match event {
            StreamEvent::Start => {}
            StreamEvent::TextStart { index } => self.open_part(index, Buffer::Text(String::new()))?,
            StreamEvent::ThinkingStart { index, redacted } => self.open_part(
                index,
                Buffer::Thinking {
                    text: String::new(),
                    redacted,
                },
            )?,
            StreamEvent::ToolCallStart { index, id, name } => {
                self.open_part(index, Buffer::ToolCall { id, name })?
            }
            StreamEvent::TextDelta { index, delta } => {
                self.append(index, PartKind::Text, &delta)?
            }
            StreamEvent::ThinkingDelta { index, delta } => {
                self.append(index, PartKind::Thinking, &delta)?
            }
            StreamEvent::TextComplete { index } => self.close_part(index, PartKind::Text, None)?,
            StreamEvent::ThinkingComplete { index } => {
                self.close_part(index, PartKind::Thinking, None)?
            }
            StreamEvent::ToolCallComplete { index, parameters } => {
                self.close_part(index, PartKind::ToolCall, Some(parameters))?
            }
            StreamEvent::Complete {
                finish_reason,
                usage,
            } => {
                if let Some((local, _)) = self.open.iter().next() {
                    return Err(PipelineError::Accumulator(format!(
                        "part {local} is still open when the turn completed"
                    )));
                }
                let parts = std::mem::take(&mut self.completed);
                return Ok(Step::Complete(TurnOutput {
                    message: Message::assistant(parts),
                    finish_reason,
                    usage,
                }));
            }
            StreamEvent::Error { message, code } => {
                self.open.clear();
                self.completed.clear();
                return Ok(Step::Failed { message, code });
            }
        }
        Ok(Step::Pending)
    }

    /// Completed parts plus a synthesized part for each still-open one, for a
    /// turn interrupted by cancellation. `None` if nothing was produced.
    pub fn partial(&self) -> Option<Message> {
        let mut parts = self.completed.clone();
        parts.extend(self.open.values().map(|open| match &open.buffer {
            Buffer::Text(text) => ContentPart::text(text.clone()),
            Buffer::Thinking { text, redacted } => ContentPart::Thinking {
                thinking: text.clone(),
                redacted: *redacted,
            },
            Buffer::ToolCall { id, name } => {
                ContentPart::tool_call(id.clone(), name.clone(), Default::default())
            }
        }));
        if parts.is_empty() {
            None
        } else {
            Some(Message::assistant(parts))
        }
    }

    fn open_part(&mut self, local: u32, buffer: Buffer) -> Result<(), PipelineError> {
        if !self.seen.insert(local) {
            return Err(PipelineError::Accumulator(format!(
                "part index {local} was already used in this turn"
            )));
        }
        let global = self.next_index;
        self.next_index += 1;
        let kind = buffer.kind();
        trace!(local, global, ?kind, "part started");
        self.open.insert(local, OpenBuffer { global, buffer });
        if let Some(observer) = &self.observer {
            observer.on_part_start(global, kind);
        }
        Ok(())
    }

    fn check_open(&self, local: u32, kind: PartKind) -> Result<(), PipelineError> {
        let open = self.open.get(&local).ok_or_else(|| {
            PipelineError::Accumulator(format!("no open part at index {local}"))
        })?;
        if open.buffer.kind() != kind {
            return Err(PipelineError::Accumulator(format!(
                "part {local} is {:?}, got a {:?} event",
                open.buffer.kind(),
                kind
            )));
        }
        Ok(())
    }

    fn append(&mut self, local: u32, kind: PartKind, delta: &str) -> Result<(), PipelineError> {
        self.check_open(local, kind)?;
        let Some(open) = self.open.get_mut(&local) else {
            return Ok(());
        };
        let global = open.global;
        let accumulated = match &mut open.buffer {
            Buffer::Text(text) | Buffer::Thinking { text, .. } => {
                text.push_str(delta);
                text.as_str()
            }
            Buffer::ToolCall { .. } => {
                return Err(PipelineError::Accumulator(format!(
                    "tool-call part {local} does not take deltas"
                )))
            }
        };
        if let Some(observer) = &self.observer {
            observer.on_part_update(global, kind, delta, accumulated);
        }
        Ok(())
    }

    fn close_part(
        &mut self,
        local: u32,
        kind: PartKind,
        parameters: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<(), PipelineError> {
        self.check_open(local, kind)?;
        let Some(open) = self.open.remove(&local) else {
            return Ok(());
        };
        let part = match open.buffer {
            Buffer::Text(text) => ContentPart::text(text),
            Buffer::Thinking { text, redacted } => ContentPart::Thinking {
                thinking: text,
                redacted,
            },
            Buffer::ToolCall { id, name } => {
                ContentPart::tool_call(id, name, parameters.unwrap_or_default())
            }
        };
        trace!(local, global = open.global, ?kind, "part completed");
        if let Some(observer) = &self.observer {
            observer.on_part_end(open.global, kind, &part);
        }
        self.completed.push(part);
        Ok(())
    }
}
