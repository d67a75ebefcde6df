//! Shared fixtures: a provider that replays scripted turns.
#![allow(dead_code)]

use ai_turn_runtime::drivers::{anthropic, openai, Provider, TurnRequest};
use ai_turn_runtime::pipeline::event_map::replay_turn;
use ai_turn_runtime::tools::ToolResolver;
use ai_turn_runtime::types::{ToolDefinition, ToolOutcome, TurnResult};
use ai_turn_runtime::{BoxStream, Error, FinishReason, Message, Result, StreamEvent, Usage};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// What the provider does for one turn.
pub enum Script {
    /// Canonical events, streamed as-is.
    Events(Vec<StreamEvent>),
    /// A one-shot result (replayed as events when streaming).
    Turn(TurnResult),
    /// Raw OpenAI SSE `data:` payloads, run through the OpenAI adapter.
    OpenAiFrames(Vec<String>),
    /// Raw Anthropic SSE `data:` payloads, run through the Anthropic adapter.
    AnthropicFrames(Vec<String>),
    /// Transport failure.
    Transport(String),
    /// Stream `before`, wait for `gate`, then stream `after`.
    Gated {
        before: Vec<StreamEvent>,
        gate: Arc<Notify>,
        after: Vec<StreamEvent>,
    },
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    streaming: bool,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn streaming(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            streaming: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn one_shot(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            streaming: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: TurnRequest<'_>) -> Result<Script> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.to_vec(),
        });
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::transport("no scripted turn left"))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: TurnRequest<'_>) -> Result<TurnResult> {
        match self.next(request)? {
            Script::Turn(result) => Ok(result),
            Script::Transport(message) => Err(Error::transport(message)),
            _ => Err(Error::transport("streaming script used for a one-shot call")),
        }
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn stream(&self, request: TurnRequest<'_>) -> Result<BoxStream<'static, StreamEvent>> {
        match self.next(request)? {
            Script::Events(events) => Ok(Box::pin(stream::iter(events).map(Ok::<_, Error>))),
            Script::Turn(result) => Ok(Box::pin(stream::iter(replay_turn(result)).map(Ok::<_, Error>))),
            Script::OpenAiFrames(frames) => Ok(openai::stream_events(Box::pin(
                stream::iter(frames).map(Ok::<_, Error>),
            ))),
            Script::AnthropicFrames(frames) => Ok(anthropic::stream_events(Box::pin(
                stream::iter(frames).map(Ok::<_, Error>),
            ))),
            Script::Transport(message) => Err(Error::transport(message)),
            Script::Gated {
                before,
                gate,
                after,
            } => {
                let tail = stream::once(async move {
                    gate.notified().await;
                    stream::iter(after)
                })
                .flatten();
                Ok(Box::pin(stream::iter(before).chain(tail).map(Ok::<_, Error>)))
            }
        }
    }
}

/// Resolver answering every call with the same content.
pub struct ConstResolver {
    content: String,
}

impl ConstResolver {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
impl ToolResolver for ConstResolver {
    async fn on_tool_call(
        &self,
        _name: &str,
        _parameters: &Map<String, Value>,
    ) -> anyhow::Result<Option<ToolOutcome>> {
        Ok(Some(ToolOutcome::success(self.content.clone())))
    }
}

pub fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// `start, text-start(0), text-delta(0, ..)*, text-complete(0), complete(reason, usage)`
pub fn text_turn(deltas: &[&str], finish_reason: FinishReason, usage: Usage) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::Start, StreamEvent::TextStart { index: 0 }];
    events.extend(deltas.iter().map(|d| StreamEvent::TextDelta {
        index: 0,
        delta: d.to_string(),
    }));
    events.push(StreamEvent::TextComplete { index: 0 });
    events.push(StreamEvent::Complete {
        finish_reason,
        usage,
    });
    events
}

/// One turn requesting the given tool calls, finishing with `FunctionCall`.
pub fn tool_call_turn(calls: &[(&str, &str, Value)], usage: Usage) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::Start];
    for (i, (id, name, parameters)) in calls.iter().enumerate() {
        let index = i as u32;
        events.push(StreamEvent::ToolCallStart {
            index,
            id: id.to_string(),
            name: name.to_string(),
        });
        events.push(StreamEvent::ToolCallComplete {
            index,
            parameters: params(parameters.clone()),
        });
    }
    events.push(StreamEvent::Complete {
        finish_reason: FinishReason::FunctionCall,
        usage,
    });
    events
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
