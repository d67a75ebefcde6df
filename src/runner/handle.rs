use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::result::RunResult;
use crate::{Error, ErrorContext, Result};

/// Cooperative cancellation signal shared between a run and its callers.
///
/// Cancelling is idempotent and never interrupts an in-flight provider or tool call;
/// the run notices at its next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A handle cancelled together with this one that can also be cancelled alone.
    pub fn child(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.child_token(),
        }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl From<CancellationToken> for CancelHandle {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

/// A run executing on the tokio runtime.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancelHandle,
    task: JoinHandle<Result<RunResult>>,
}

impl RunHandle {
    pub(crate) fn new(cancel: CancelHandle, task: JoinHandle<Result<RunResult>>) -> Self {
        Self { cancel, task }
    }

    /// Request cancellation. Calling it again, or after the run finished, does nothing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the final result.
    ///
    /// Infrastructure failures (transport errors, broken adapters) come back as `Err`;
    /// model and tool failures are inside the `RunResult`.
    pub async fn wait(self) -> Result<RunResult> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::runtime_with_context(
                format!("run task did not complete: {e}"),
                ErrorContext::new()
                    .with_details(if e.is_panic() { "panicked" } else { "aborted" })
                    .with_source("run_handle"),
            )),
        }
    }
}
