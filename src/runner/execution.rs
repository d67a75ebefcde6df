//! 单轮执行：调用 provider 并把规范事件喂给累加器。
//!
//! Single-turn execution.

use futures::{stream, StreamExt};
use tracing::{debug, trace};

use crate::drivers::TurnRequest;
use crate::pipeline::accumulate::{PartAccumulator, Step, TurnOutput};
use crate::pipeline::event_map::replay_turn;
use crate::types::events::StreamEvent;
use crate::{BoxStream, Result};

use super::core::Runner;
use super::handle::CancelHandle;

/// How one turn's event stream ended.
#[derive(Debug)]
pub(crate) enum TurnOutcome {
    Complete(TurnOutput),
    Failed {
        message: String,
        code: Option<String>,
    },
    /// The stream ran dry without `complete` or `error`.
    Incomplete,
    /// Cancellation observed between events. The accumulator keeps the partial turn.
    Cancelled,
}

impl Runner {
    /// Call the provider once and consume its events into `acc`.
    ///
    /// Provider and adapter failures are returned as `Err` untouched.
    pub(crate) async fn execute_turn(
        &self,
        request: TurnRequest<'_>,
        streaming: bool,
        acc: &mut PartAccumulator,
        cancel: &CancelHandle,
    ) -> Result<TurnOutcome> {
        let mut events: BoxStream<'static, StreamEvent> = if streaming {
            self.provider.stream(request).await?
        } else {
            let result = self.provider.generate(request).await?;
            Box::pin(stream::iter(replay_turn(result).into_iter().map(Ok::<_, crate::Error>)))
        };

        loop {
            if cancel.is_cancelled() {
                debug!("cancellation observed mid-turn");
                return Ok(TurnOutcome::Cancelled);
            }
            let Some(event) = events.next().await else {
                return Ok(TurnOutcome::Incomplete);
            };
            let event = event?;
            trace!(?event, "canonical event");
            match acc.push(event)? {
                Step::Pending => {}
                Step::Complete(output) => return Ok(TurnOutcome::Complete(output)),
                Step::Failed { message, code } => {
                    return Ok(TurnOutcome::Failed { message, code })
                }
            }
        }
    }
}
