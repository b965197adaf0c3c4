//! Deterministic recovery: the manual queue runs everything on the test task
//! and the strategy recovers inline.

mod common;

use common::*;
use resilient_records::events::{NotificationBroadcaster, NotificationName};
use resilient_records::execution::{ExecutionQueue, ManualQueue};
use resilient_records::models::{Database, RemoteErrorCode};
use resilient_records::operation::{Operation, OperationKind, OperationState};
use resilient_records::orchestration::{
    OperationRunner, RecoveryStrategy, StandardErrorClassifier, StandardReplicator,
};
use resilient_records::remote::MemoryReceiver;
use std::sync::Arc;

struct Harness {
    store: Arc<ScriptedStore>,
    queue: Arc<ManualQueue>,
    runner: OperationRunner,
    notifications: NotificationLog,
}

fn harness(store: ScriptedStore, replicator: StandardReplicator) -> Harness {
    let store = Arc::new(store);
    let broadcaster = NotificationBroadcaster::default();
    let notifications = NotificationLog::attach(&broadcaster);
    let queue = Arc::new(ManualQueue::new());
    let strategy = RecoveryStrategy::new(
        Arc::new(StandardErrorClassifier::new()),
        Arc::new(replicator),
        queue.clone(),
        broadcaster.clone(),
    );
    let runner = OperationRunner::new(store.clone(), broadcaster).with_failure_sink(Arc::new(strategy));
    Harness {
        store,
        queue,
        runner,
        notifications,
    }
}

#[tokio::test]
async fn test_split_runs_in_dependency_order() {
    let h = harness(ScriptedStore::new().with_max_batch(10), StandardReplicator::new());
    let receiver = Arc::new(MemoryReceiver::new());

    h.queue
        .submit(Operation::upload(notes("note", 21), Database::Private).with_receiver(receiver.clone()))
        .unwrap();
    let ran = h.queue.run_until_idle(&h.runner).await;

    assert_eq!(ran, 5);
    assert_eq!(h.store.save_sizes(), vec![21, 10, 11, 5, 6]);
    assert_eq!(h.queue.pending_len(), 0);

    let ids: Vec<String> = receiver
        .records()
        .iter()
        .map(|record| record.id.to_string())
        .collect();
    let expected: Vec<String> = (0..21).map(|i| format!("note-{i}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_unregistered_kind_is_unrecovered() {
    let h = harness(
        ScriptedStore::new().with_max_batch(2),
        StandardReplicator::new().without(OperationKind::Upload),
    );

    h.queue
        .submit(Operation::upload(notes("note", 4), Database::Private))
        .unwrap();
    let ran = h.queue.run_until_idle(&h.runner).await;

    assert_eq!(ran, 1);
    assert_eq!(h.store.save_sizes(), vec![4]);
    assert_eq!(h.notifications.count(&NotificationName::UNRECOVERED), 1);
    assert_eq!(h.notifications.count(&NotificationName::LIMIT_EXCEEDED), 1);
}

#[tokio::test]
async fn test_failed_dependency_does_not_cancel_dependent() {
    let h = harness(
        ScriptedStore::new().failing_with(RemoteErrorCode::ServiceUnavailable),
        StandardReplicator::new(),
    );

    let first = Operation::upload(notes("a", 1), Database::Private);
    let second = Operation::upload(notes("b", 1), Database::Private).depends_on(&first.handle());
    let first_handle = h.queue.submit(first).unwrap();
    let second_handle = h.queue.submit(second).unwrap();

    assert_eq!(h.queue.run_until_idle(&h.runner).await, 2);
    assert_eq!(first_handle.state(), OperationState::Failed);
    assert_eq!(second_handle.state(), OperationState::Failed);
    assert_eq!(h.notifications.count(&NotificationName::RETRIABLE), 2);
}

#[tokio::test]
async fn test_partial_failure_split_on_batch_write() {
    let h = harness(
        ScriptedStore::new().failing_with(RemoteErrorCode::PartialFailure),
        StandardReplicator::new(),
    );

    h.queue
        .submit(Operation::upload(notes("note", 2), Database::Private))
        .unwrap();
    // Run only the original: its two halves are queued behind it
    let original = h.queue.take_pending().remove(0);
    h.runner.execute(original).await;

    let replacements = h.queue.take_pending();
    assert_eq!(replacements.len(), 2);
    assert_eq!(replacements[0].spec().records().len(), 1);
    assert_eq!(replacements[1].spec().records().len(), 1);
    assert!(replacements[0].depends_on_handle(&replacements[1].handle()));
}
