//! Batch runner.

use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::runner::{CancelHandle, RunRequest, Runner};
use crate::types::result::RunResult;

/// Outcome of a batch. Indices refer to positions in the input.
///
/// A run that ended with a model or tool error is still a success here: it produced
/// a [`RunResult`]. Failures are runs whose provider failed underneath them.
#[derive(Debug, Clone)]
pub struct BatchResult<T, E> {
    pub successes: Vec<(usize, T)>,
    pub failures: Vec<(usize, E)>,
    pub execution_time: Duration,
    pub total_processed: usize,
}

impl<T, E> BatchResult<T, E> {
    pub fn new() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
            execution_time: Duration::ZERO,
            total_processed: 0,
        }
    }
    pub fn add_success(&mut self, i: usize, r: T) {
        self.successes.push((i, r));
    }
    pub fn add_failure(&mut self, i: usize, e: E) {
        self.failures.push((i, e));
    }
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Both lists sorted by input position.
    fn sort(&mut self) {
        self.successes.sort_by_key(|(i, _)| *i);
        self.failures.sort_by_key(|(i, _)| *i);
    }
}

impl<T, E> Default for BatchResult<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    pub message: String,
    pub index: usize,
}

impl BatchError {
    pub fn new(msg: impl Into<String>, idx: usize) -> Self {
        Self {
            message: msg.into(),
            index: idx,
        }
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Run {} failed: {}", self.index, self.message)
    }
}

impl std::error::Error for BatchError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Runs in flight at once. Values below 1 are treated as 1.
    pub max_concurrency: usize,
    /// Keep going after a run fails with an infrastructure error.
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            continue_on_error: true,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }
    pub fn with_continue_on_error(mut self, c: bool) -> Self {
        self.continue_on_error = c;
        self
    }
}

/// Runs many independent runs on one [`Runner`] with bounded concurrency.
#[derive(Clone)]
pub struct BatchRunner {
    runner: Runner,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(runner: Runner) -> Self {
        Self::with_config(runner, BatchConfig::default())
    }

    pub fn with_config(runner: Runner, config: BatchConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn run_all(&self, requests: Vec<RunRequest>) -> BatchResult<RunResult, BatchError> {
        self.run_all_with_cancel(requests, &CancelHandle::new()).await
    }

    /// Like [`run_all`](Self::run_all); cancelling `cancel` cancels every run in the batch.
    pub async fn run_all_with_cancel(
        &self,
        requests: Vec<RunRequest>,
        cancel: &CancelHandle,
    ) -> BatchResult<RunResult, BatchError> {
        let start = Instant::now();
        let total = requests.len();
        let limit = self.config.max_concurrency.max(1);
        let runner = &self.runner;
        debug!(total, max_concurrency = limit, "starting batch");

        let mut runs = stream::iter(requests.into_iter().enumerate())
            .map(|(i, request)| {
                let cancel = cancel.child();
                async move { (i, runner.run(request, &cancel).await) }
            })
            .buffer_unordered(limit);

        let mut result = BatchResult::new();
        while let Some((i, outcome)) = runs.next().await {
            result.total_processed += 1;
            match outcome {
                Ok(run) => result.add_success(i, run),
                Err(e) => {
                    warn!(index = i, error = %e, "run failed");
                    result.add_failure(i, BatchError::new(e.to_string(), i));
                    if !self.config.continue_on_error {
                        break;
                    }
                }
            }
        }

        result.sort();
        result.execution_time = start.elapsed();
        result
    }
}
