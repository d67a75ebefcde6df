//! # Streaming Pipeline
//!
//! Everything between a vendor's wire chunks and a finished assistant message.
//!
//! ```text
//! Vendor chunks → StreamAdapter → Canonical events → PartAccumulator → Message
//!      │               │                 │                   │
//!   OpenAI,        per-turn state     start/delta/      global part index,
//!   Anthropic...   machine            complete/...      observer callbacks
//! ```
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`event_map`] | Adapter contract, the shared event emitter, stream mapping |
//! | [`accumulate`] | Builds content parts from canonical events |

pub mod accumulate;
pub mod event_map;

#[cfg(test)]
mod tests;

/// Pipeline error types
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Accumulator error: {0}")]
    Accumulator(String),
}
