//! 回合编排器：驱动多轮 provider 调用与工具执行，直至终止条件。
//!
//! Turn orchestrator.
//!
//! [`Runner`] owns a provider and default [`RunnerConfig`]; every [`RunRequest`] becomes
//! one single-use run with its own accumulator and message list. Runs share nothing
//! mutable, so many can execute at once (see [`crate::batch`]).

mod builder;
mod config;
mod core;
mod execution;
mod handle;

pub use builder::RunRequest;
pub use config::RunnerConfig;
pub use core::Runner;
pub use handle::{CancelHandle, RunHandle};
