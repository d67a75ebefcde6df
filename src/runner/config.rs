//! 运行配置：迭代上限、流式开关、截断输出策略。
//!
//! Runner configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, ErrorContext, Result};

/// Defaults applied to every run started by a [`Runner`](super::Runner).
///
/// Values set on a [`RunRequest`](super::RunRequest) take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum number of provider calls per run. `None` means unbounded.
    pub max_iterations: Option<u32>,
    /// Use the provider's streaming capability instead of one-shot calls.
    pub stream: bool,
    /// Treat `FinishReason::Length` as success instead of an incomplete-output error.
    pub accept_truncated: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            stream: false,
            accept_truncated: false,
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden from the environment:
    /// - `AI_TURN_MAX_ITERATIONS` (positive integer)
    /// - `AI_TURN_STREAM` (`1` or `true`)
    /// - `AI_TURN_ACCEPT_TRUNCATED` (`1` or `true`)
    ///
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = std::env::var("AI_TURN_MAX_ITERATIONS")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            config.max_iterations = Some(n);
        }
        if let Some(flag) = env_flag("AI_TURN_STREAM") {
            config.stream = flag;
        }
        if let Some(flag) = env_flag("AI_TURN_ACCEPT_TRUNCATED") {
            config.accept_truncated = flag;
        }
        config
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == Some(0) {
            return Err(Error::configuration_with_context(
                "max_iterations must be at least 1",
                ErrorContext::new()
                    .with_field_path("runner.max_iterations")
                    .with_details("omit the field for an unbounded run")
                    .with_source("runner_config"),
            ));
        }
        Ok(())
    }

    pub fn with_max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_accept_truncated(mut self, accept: bool) -> Self {
        self.accept_truncated = accept;
        self
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
