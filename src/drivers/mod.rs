//! Provider 能力抽象：一次性生成与可选的流式生成
//!
//! Provider capability layer. A [`Provider`] is an already-authenticated handle to one
//! model service. The orchestrator only ever sees canonical data: one-shot calls return a
//! [`TurnResult`], streaming calls return canonical [`StreamEvent`]s. Translating vendor
//! chunks is the job of the per-vendor [`StreamAdapter`](crate::StreamAdapter)s in this
//! module, applied with [`adapt_stream`](crate::pipeline::event_map::adapt_stream).
//!
//! | Adapter | Wire format |
//! |---------|-------------|
//! | [`openai::OpenAiAdapter`] | Chat Completions chunks (`choices[].delta`) |
//! | [`anthropic::AnthropicAdapter`] | Messages API events (`content_block_*`) |

pub mod anthropic;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::types::events::StreamEvent;
use crate::types::message::Message;
use crate::types::result::TurnResult;
use crate::types::tool::ToolDefinition;
use crate::{BoxStream, Result};

pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;

/// Sampling options forwarded untouched to the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Vendor-specific request fields, merged into the request body by the provider.
    pub extra: Option<Value>,
}

impl GenerationOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Everything one turn sends to the provider.
#[derive(Debug, Clone, Copy)]
pub struct TurnRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub options: &'a GenerationOptions,
}

/// Model service capability consumed by the orchestrator.
///
/// `generate` is mandatory. `stream` is optional and gated by
/// [`supports_streaming`](Self::supports_streaming); the default implementation fails
/// fast with [`Error::StreamingUnsupported`] so a streaming run never silently degrades
/// into one-shot calls.
///
/// Any `Err` returned here is an infrastructure failure and propagates out of the run.
/// Model-level failures belong in [`TurnResult::Error`] or a canonical `error` event.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier used in logs and spans.
    fn provider_id(&self) -> &str;

    /// One-shot generation.
    async fn generate(&self, request: TurnRequest<'_>) -> Result<TurnResult>;

    fn supports_streaming(&self) -> bool {
        false
    }

    /// Streaming generation as canonical events for exactly one turn.
    async fn stream(&self, request: TurnRequest<'_>) -> Result<BoxStream<'static, StreamEvent>> {
        let _ = request;
        Err(Error::StreamingUnsupported {
            provider: self.provider_id().to_string(),
        })
    }
}
