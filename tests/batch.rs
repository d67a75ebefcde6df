mod common;

use ai_turn_runtime::batch::{BatchConfig, BatchRunner};
use ai_turn_runtime::{FinishReason, Message, RunRequest, Runner, Usage};
use common::{text_turn, Script, ScriptedProvider};
use tokio_test::assert_ok;

#[tokio::test]
async fn batch_shares_one_provider_across_runs() {
    let provider = ScriptedProvider::streaming(
        (0..4)
            .map(|_| Script::Events(text_turn(&["ok"], FinishReason::Stop, Usage::new(2, 1))))
            .collect(),
    );
    let batch = BatchRunner::with_config(
        Runner::new(provider.clone()),
        BatchConfig::new().with_max_concurrency(3),
    );

    let requests = (0..4)
        .map(|i| RunRequest::new(vec![Message::user(format!("q{i}"))]).stream(true))
        .collect();
    let result = batch.run_all(requests).await;

    assert!(result.all_succeeded());
    assert_eq!(result.success_count(), 4);
    let indices: Vec<_> = result.successes.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(result.successes.iter().all(|(_, r)| r.is_success()));
    assert_eq!(provider.requests().len(), 4);
}

#[tokio::test]
async fn stop_on_first_infrastructure_failure() {
    // One script only: the second run finds nothing left and fails as a transport error.
    let provider = ScriptedProvider::streaming(vec![Script::Events(text_turn(
        &["ok"],
        FinishReason::Stop,
        Usage::new(1, 1),
    ))]);
    let batch = BatchRunner::with_config(
        Runner::new(provider),
        BatchConfig::new()
            .with_max_concurrency(1)
            .with_continue_on_error(false),
    );

    let requests = (0..3)
        .map(|_| RunRequest::new(vec![Message::user("q")]).stream(true))
        .collect();
    let result = batch.run_all(requests).await;

    assert_eq!(result.success_count(), 1);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.total_processed, 2);
    assert_eq!(result.failures[0].0, 1);
    assert!(result.failures[0].1.to_string().starts_with("Run 1 failed"));
}

#[test]
fn batch_config_from_yaml() {
    let config: BatchConfig = assert_ok!(serde_yaml::from_str("max_concurrency: 8\n"));
    assert_eq!(config.max_concurrency, 8);
    assert!(config.continue_on_error);
}
