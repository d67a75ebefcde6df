use std::sync::Arc;

use crate::drivers::GenerationOptions;
use crate::pipeline::accumulate::PartObserver;
use crate::telemetry::Tracer;
use crate::tools::ToolResolver;
use crate::types::message::Message;
use crate::types::tool::ToolDefinition;

/// Inputs of one run.
///
/// Only the initial messages are required. `max_iterations` and `stream` override the
/// runner's [`RunnerConfig`](super::RunnerConfig) when set.
pub struct RunRequest {
    pub(crate) messages: Vec<Message>,
    pub(crate) tools: Vec<ToolDefinition>,
    pub(crate) options: GenerationOptions,
    pub(crate) resolver: Option<Arc<dyn ToolResolver>>,
    pub(crate) max_iterations: Option<u32>,
    pub(crate) stream: Option<bool>,
    pub(crate) tracer: Option<Arc<dyn Tracer>>,
    pub(crate) observer: Option<Arc<dyn PartObserver>>,
}

impl RunRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            options: GenerationOptions::default(),
            resolver: None,
            max_iterations: None,
            stream: None,
            tracer: None,
            observer: None,
        }
    }

    /// Tools advertised to the provider on every turn.
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ToolResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Part callbacks. Indices are global across the run's turns.
    pub fn observer(mut self, observer: Arc<dyn PartObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

impl std::fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRequest")
            .field("messages", &self.messages.len())
            .field("tools", &self.tools.iter().map(|t| &t.name).collect::<Vec<_>>())
            .field("options", &self.options)
            .field("has_resolver", &self.resolver.is_some())
            .field("max_iterations", &self.max_iterations)
            .field("stream", &self.stream)
            .finish()
    }
}
