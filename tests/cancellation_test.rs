mod common;

use common::*;
use resilient_records::config::ResilienceConfig;
use resilient_records::execution::QueueError;
use resilient_records::models::{Database, RemoteErrorCode};
use resilient_records::operation::{Operation, OperationState};
use resilient_records::runtime::ResilienceRuntime;
use resilient_records::ResilienceError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_cancelled_before_submission_has_no_effects() -> anyhow::Result<()> {
    let store = Arc::new(ScriptedStore::new().failing_with(RemoteErrorCode::LimitExceeded));
    let runtime = ResilienceRuntime::new(store.clone(), ResilienceConfig::default())?;
    let notifications = NotificationLog::attach(runtime.broadcaster());
    let completions = CompletionLog::default();

    let operation = Operation::upload(notes("note", 8), Database::Private)
        .with_completion(completions.callback());
    let handle = operation.handle();
    operation.cancel();

    let result = runtime.submit(operation);
    assert!(matches!(
        result,
        Err(ResilienceError::Queue(QueueError::Cancelled(_)))
    ));
    runtime.settle().await;

    assert_eq!(handle.state(), OperationState::Cancelled);
    assert!(store.calls().is_empty());
    assert!(notifications.names().is_empty());
    assert_eq!(completions.states(), vec![OperationState::Cancelled]);
    runtime.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_cancel_during_delete_delay_skips_remote_call() -> anyhow::Result<()> {
    let store = Arc::new(ScriptedStore::new());
    let runtime = ResilienceRuntime::new(store.clone(), ResilienceConfig::default())?;

    let handle = runtime.submit(
        Operation::delete(notes("note", 2), Database::Public).with_delay(Duration::from_secs(60)),
    )?;
    handle.cancel();

    let state = timeout(Duration::from_secs(5), handle.wait_terminal()).await?;
    assert_eq!(state, OperationState::Cancelled);
    runtime.settle().await;
    assert!(store.calls().is_empty());
    runtime.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_cancel_all_stops_waiting_dependents() -> anyhow::Result<()> {
    let store = Arc::new(ScriptedStore::new());
    let runtime = ResilienceRuntime::new(store.clone(), ResilienceConfig::default())?;

    let never_submitted = Operation::upload(notes("a", 1), Database::Private);
    let dependent = Operation::upload(notes("b", 1), Database::Private)
        .depends_on(&never_submitted.handle());
    let handle = runtime.submit(dependent)?;
    assert_eq!(runtime.primary_queue().in_flight(), 1);

    assert_eq!(runtime.primary_queue().cancel_all(), 1);
    timeout(Duration::from_secs(5), runtime.settle()).await?;

    assert_eq!(handle.state(), OperationState::Cancelled);
    assert!(store.calls().is_empty());
    runtime.shutdown().await;
    Ok(())
}
