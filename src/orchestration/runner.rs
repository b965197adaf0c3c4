//! # Operation Runner
//!
//! Executes one operation body against the remote store.
//!
//! ## Execution steps
//!
//! ```text
//! dependency wait ─▶ remote-call checkpoint ─▶ Executing ─▶ remote call
//!                                                      ├─▶ Completed (records to receiver)
//!                                                      ├─▶ Completed (unknown item dropped)
//!                                                      └─▶ Failed ─▶ FailureSink
//! ```
//!
//! Every side-effecting step goes through the operation's cancellation
//! guard. A cancelled operation finishes `Cancelled` without a remote call,
//! without recovery, and without a broadcast.

use super::error_classifier::{classify, ErrorContext};
use crate::events::NotificationBroadcaster;
use crate::logging::log_operation_event;
use crate::models::{Record, RemoteError};
use crate::operation::{
    CancellationGuard, Cancelled, Checkpoint, Operation, OperationSpec, OperationState,
};
use crate::remote::RemoteStore;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A spent operation that ended `Failed`, with what it had in flight
#[derive(Debug)]
pub struct FailedOperation {
    pub operation: Operation,
    pub error: RemoteError,
    pub records_in_flight: Vec<Record>,
}

/// Where the runner hands failed operations
pub trait FailureSink: Send + Sync {
    fn report(&self, failure: FailedOperation);
}

enum RunError {
    Cancelled(Cancelled),
    Remote(RemoteError),
}

impl From<Cancelled> for RunError {
    fn from(cancelled: Cancelled) -> Self {
        Self::Cancelled(cancelled)
    }
}

impl From<RemoteError> for RunError {
    fn from(error: RemoteError) -> Self {
        Self::Remote(error)
    }
}

/// Runs operation bodies; shared by every queue
pub struct OperationRunner {
    store: Arc<dyn RemoteStore>,
    broadcaster: NotificationBroadcaster,
    failures: Option<Arc<dyn FailureSink>>,
}

impl OperationRunner {
    pub fn new(store: Arc<dyn RemoteStore>, broadcaster: NotificationBroadcaster) -> Self {
        Self {
            store,
            broadcaster,
            failures: None,
        }
    }

    /// Hand failed operations to `sink` instead of only announcing them
    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failures = Some(sink);
        self
    }

    pub fn broadcaster(&self) -> &NotificationBroadcaster {
        &self.broadcaster
    }

    /// Wait for dependencies, then run. Returns the terminal state reached.
    pub async fn execute(&self, operation: Operation) -> OperationState {
        match self.await_dependencies(&operation).await {
            Ok(()) => self.run(operation).await,
            Err(cancelled) => self.abandon(operation, cancelled),
        }
    }

    /// Suspend until every dependency is Completed, Cancelled or Failed.
    ///
    /// A failed dependency does not cancel its dependents.
    pub async fn await_dependencies(&self, operation: &Operation) -> Result<(), Cancelled> {
        let guard = operation.guard();
        if operation.dependencies().is_empty() {
            return guard.check(Checkpoint::DependencyWait);
        }

        debug!(
            operation_id = %operation.id(),
            dependencies = operation.dependencies().len(),
            "Waiting for dependencies"
        );
        let waits = operation
            .dependencies()
            .iter()
            .map(|dependency| dependency.wait_terminal());
        let states = guard.suspend(Checkpoint::DependencyWait, join_all(waits)).await?;

        if states.iter().any(|state| *state != OperationState::Completed) {
            debug!(
                operation_id = %operation.id(),
                states = ?states,
                "Dependency ended without completing, proceeding"
            );
        }
        Ok(())
    }

    /// Run the body. Dependencies must already be terminal.
    pub async fn run(&self, operation: Operation) -> OperationState {
        let guard = operation.guard();
        if let Err(cancelled) = guard.check(Checkpoint::RemoteCall) {
            return self.abandon(operation, cancelled);
        }

        if !operation.handle().transition(OperationState::Executing) {
            warn!(
                operation_id = %operation.id(),
                state = %operation.state(),
                "Operation already ran, refusing to execute again"
            );
            return operation.state();
        }
        log_operation_event(&operation.reference(), OperationState::Executing, None);

        match self.perform(&operation, &guard).await {
            Ok(()) => self.complete(operation),
            Err(RunError::Cancelled(cancelled)) => self.abandon(operation, cancelled),
            Err(RunError::Remote(error)) => self.fail(operation, error),
        }
    }

    async fn perform(&self, operation: &Operation, guard: &CancellationGuard) -> Result<(), RunError> {
        match operation.spec() {
            OperationSpec::Upload(spec) => {
                guard.check(Checkpoint::RemoteCall)?;
                let saved = self.store.save(spec.database, &spec.records).await?;
                Self::deliver(operation, saved);
            }
            OperationSpec::Delete(spec) => {
                if let Some(delay) = spec.delay {
                    guard.suspend(Checkpoint::Delay, tokio::time::sleep(delay)).await?;
                }
                guard.check(Checkpoint::RemoteCall)?;
                let deleted = self.store.delete(spec.database, &spec.record_ids()).await?;
                debug!(
                    operation_id = %operation.id(),
                    deleted = deleted.len(),
                    "Records deleted"
                );
            }
            OperationSpec::Download(spec) => {
                guard.check(Checkpoint::RemoteCall)?;
                let records = self
                    .store
                    .query(spec.database, &spec.query, spec.limit)
                    .await?;
                Self::deliver(operation, records);
            }
            OperationSpec::Notify(spec) => {
                self.broadcaster.post(spec.name.clone(), spec.payload.clone());
            }
        }
        Ok(())
    }

    fn deliver(operation: &Operation, records: Vec<Record>) {
        if let Some(receiver) = operation.receiver() {
            debug!(
                operation_id = %operation.id(),
                records = records.len(),
                "Delivering records to receiver"
            );
            receiver.receive(records);
        }
    }

    fn complete(&self, operation: Operation) -> OperationState {
        operation.finish(OperationState::Completed, None);
        log_operation_event(&operation.reference(), OperationState::Completed, None);
        OperationState::Completed
    }

    /// Finish `operation` as cancelled without side effects
    pub(crate) fn abandon(&self, operation: Operation, cancelled: Cancelled) -> OperationState {
        debug!(
            operation_id = %operation.id(),
            checkpoint = %cancelled.checkpoint,
            "Operation abandoned after cancellation"
        );
        operation.finish(OperationState::Cancelled, None);
        OperationState::Cancelled
    }

    fn fail(&self, operation: Operation, error: RemoteError) -> OperationState {
        let context = ErrorContext::for_operation(&operation);
        if context.suppresses(error.code) {
            info!(
                operation_id = %operation.id(),
                error = %error,
                "Ignoring unknown item, dropped from results"
            );
            if let OperationSpec::Download(spec) = operation.spec() {
                if let Some(action) = &spec.unknown_item_action {
                    action(&error);
                }
            }
            return self.complete(operation);
        }

        operation.finish(OperationState::Failed, Some(error.clone()));
        log_operation_event(&operation.reference(), OperationState::Failed, Some(&error));

        match &self.failures {
            Some(sink) => {
                let records_in_flight = operation.spec().records().to_vec();
                sink.report(FailedOperation {
                    operation,
                    error,
                    records_in_flight,
                });
            }
            None => {
                warn!(
                    operation_id = %operation.id(),
                    error = %error,
                    "No recovery configured, announcing failure only"
                );
                self.broadcaster.announce(&classify(&error, &context));
            }
        }
        OperationState::Failed
    }
}

impl fmt::Debug for OperationRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRunner")
            .field("store", &self.store.store_name())
            .field("has_failure_sink", &self.failures.is_some())
            .finish()
    }
}
