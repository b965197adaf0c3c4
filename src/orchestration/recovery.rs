//! # Recovery Strategy
//!
//! Turns a classified capacity failure into corrected replacement operations
//! and resubmits them.
//!
//! ## Batch writes (`LimitExceeded`, and `BatchFailure` / `PartialFailure` when enabled)
//!
//! ```text
//! records[0 .. N/2)  ──▶ first replica ◀──┐ depends on
//! records[N/2 .. N)  ──▶ second replica ──┘
//! ```
//!
//! The second replica is submitted first and the first replica second; the
//! dependency edge, not submission order, decides execution order. Empty
//! halves are never submitted. A one-record batch gets a single one-record
//! replacement; if that replacement fails for size too, recovery stops with
//! [`RecoveryError::RecordTooLarge`].
//!
//! ## Downloads (`LimitExceeded`)
//!
//! One replica with the result limit halved (rounding down), or the
//! configured default when the failed download had no limit.
//!
//! Every classification is announced whether or not recovery happened;
//! recoverable failures that could not be recovered are also announced under
//! [`NotificationName::UNRECOVERED`].

use super::error_classifier::{ErrorCategory, ErrorClassification, ErrorClassifier, ErrorContext};
use super::replicator::OperationReplicator;
use super::runner::{FailedOperation, FailureSink};
use crate::constants::DEFAULT_DOWNLOAD_LIMIT;
use crate::events::{NotificationBroadcaster, NotificationName};
use crate::execution::{ExecutionQueue, QueueError};
use crate::models::Record;
use crate::operation::{
    CancellationGuard, Cancelled, Checkpoint, Operation, OperationHandle, OperationKind,
};
use crate::remote::Receiver;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Split `records` into `[0, floor(N/2))` and `[floor(N/2), N)`.
///
/// Never drops or duplicates; concatenating the halves reproduces the input.
pub fn split_batch<T: Clone>(records: &[T]) -> (Vec<T>, Vec<T>) {
    let (first, second) = records.split_at(records.len() / 2);
    (first.to_vec(), second.to_vec())
}

/// Halved download limit, or `default_limit` when none was set
pub fn halved_limit(limit: Option<usize>, default_limit: usize) -> usize {
    match limit {
        Some(limit) => limit / 2,
        None => default_limit,
    }
}

/// Errors that prevent a recoverable failure from being recovered
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("No replica available for {kind} operations")]
    NoReplica { kind: OperationKind },

    #[error("{kind} operations cannot be recovered from {category}")]
    Unsupported {
        kind: OperationKind,
        category: ErrorCategory,
    },

    #[error("Operation {operation_id} had no records in flight to resubmit")]
    NothingToResubmit { operation_id: Uuid },

    #[error("Record in operation {operation_id} exceeds the batch limit on its own")]
    RecordTooLarge { operation_id: Uuid },

    #[error("Download limit {limit:?} cannot be halved further")]
    LimitExhausted { limit: Option<usize> },

    #[error("Replacement submission failed: {0}")]
    Submission(#[from] QueueError),

    #[error("Recovery cancelled: {0}")]
    Cancelled(#[from] Cancelled),
}

/// Tunables for the recovery strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverySettings {
    /// Limit for a download replica whose source had none
    pub default_download_limit: usize,
    /// Also split batch writes on `BatchFailure` and `PartialFailure`
    pub split_on_batch_failure: bool,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            default_download_limit: DEFAULT_DOWNLOAD_LIMIT,
            split_on_batch_failure: true,
        }
    }
}

/// What happened to one failed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStatus {
    /// Replacements were submitted
    Recovered,
    /// The category is not recovered by this layer; broadcast only
    NotAttempted,
    /// Recovery was attempted and failed
    Unrecovered(RecoveryError),
    /// Resubmission was cancelled. The failure is still announced unless
    /// the guard was already cancelled when handling began.
    Cancelled,
}

/// Result of handling one failed operation
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub classification: Option<ErrorClassification>,
    pub replacements: Vec<OperationHandle>,
    pub status: RecoveryStatus,
}

/// Classifies failures, builds replacements, resubmits, and announces
pub struct RecoveryStrategy {
    classifier: Arc<dyn ErrorClassifier>,
    replicator: Arc<dyn OperationReplicator>,
    queue: Arc<dyn ExecutionQueue>,
    broadcaster: NotificationBroadcaster,
    settings: RecoverySettings,
}

impl RecoveryStrategy {
    pub fn new(
        classifier: Arc<dyn ErrorClassifier>,
        replicator: Arc<dyn OperationReplicator>,
        queue: Arc<dyn ExecutionQueue>,
        broadcaster: NotificationBroadcaster,
    ) -> Self {
        Self {
            classifier,
            replicator,
            queue,
            broadcaster,
            settings: RecoverySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RecoverySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &RecoverySettings {
        &self.settings
    }

    /// Whether this layer tries to recover `category` for an operation of `kind`
    pub fn attempts(&self, category: ErrorCategory, kind: OperationKind) -> bool {
        match category {
            ErrorCategory::LimitExceeded => true,
            ErrorCategory::BatchFailure | ErrorCategory::PartialFailure => {
                self.settings.split_on_batch_failure && kind.is_batch_write()
            }
            _ => false,
        }
    }

    /// Build replacements for `failed` without submitting them.
    ///
    /// Returned in batch order: the first half, then the second half (which
    /// depends on the first). Empty when the category is not recovered here.
    pub fn plan(
        &self,
        failed: &Operation,
        classification: &ErrorClassification,
        records_in_flight: &[Record],
        receiver: Option<Arc<dyn Receiver>>,
    ) -> Result<Vec<Operation>, RecoveryError> {
        let kind = failed.kind();
        let category = classification.category;
        if !self.attempts(category, kind) {
            return Ok(Vec::new());
        }

        match kind {
            OperationKind::Upload | OperationKind::Delete => {
                self.plan_split(failed, records_in_flight, receiver)
            }
            OperationKind::Download if category == ErrorCategory::LimitExceeded => {
                self.plan_smaller_download(failed, receiver)
            }
            _ => Err(RecoveryError::Unsupported { kind, category }),
        }
    }

    fn replica(&self, failed: &Operation, receiver: Option<&Arc<dyn Receiver>>) -> Result<Operation, RecoveryError> {
        let mut replica = self
            .replicator
            .replicate(failed)
            .ok_or(RecoveryError::NoReplica { kind: failed.kind() })?;
        if let Some(receiver) = receiver {
            replica = replica.with_receiver(receiver.clone());
        }
        Ok(replica)
    }

    fn plan_split(
        &self,
        failed: &Operation,
        records_in_flight: &[Record],
        receiver: Option<Arc<dyn Receiver>>,
    ) -> Result<Vec<Operation>, RecoveryError> {
        if records_in_flight.is_empty() {
            return Err(RecoveryError::NothingToResubmit {
                operation_id: failed.id(),
            });
        }

        if records_in_flight.len() == 1 && failed.is_single_record_retry() {
            return Err(RecoveryError::RecordTooLarge {
                operation_id: failed.id(),
            });
        }

        let (first_half, second_half) = split_batch(records_in_flight);
        let mut planned = Vec::with_capacity(2);

        let first = if first_half.is_empty() {
            None
        } else {
            let mut replica = self.replica(failed, receiver.as_ref())?;
            replica.spec_mut().set_records(first_half);
            Some(replica)
        };

        let mut second = self.replica(failed, receiver.as_ref())?;
        second.spec_mut().set_records(second_half);
        match &first {
            Some(first) => second.add_dependency(&first.handle()),
            None => second.mark_single_record_retry(),
        }

        planned.extend(first);
        planned.push(second);
        Ok(planned)
    }

    fn plan_smaller_download(
        &self,
        failed: &Operation,
        receiver: Option<Arc<dyn Receiver>>,
    ) -> Result<Vec<Operation>, RecoveryError> {
        let old_limit = failed.spec().limit();
        let new_limit = halved_limit(old_limit, self.settings.default_download_limit);
        if new_limit == 0 {
            return Err(RecoveryError::LimitExhausted { limit: old_limit });
        }

        let mut replica = self.replica(failed, receiver.as_ref())?;
        replica.spec_mut().set_limit(Some(new_limit));
        info!(
            operation_id = %failed.id(),
            replica_id = %replica.id(),
            old_limit = ?old_limit,
            new_limit = new_limit,
            "Retrying download with smaller limit"
        );
        Ok(vec![replica])
    }

    /// Plan and submit replacements. Returns their handles in batch order.
    pub fn recover(
        &self,
        failed: &Operation,
        classification: &ErrorClassification,
        records_in_flight: &[Record],
        receiver: Option<Arc<dyn Receiver>>,
        guard: &CancellationGuard,
    ) -> Result<Vec<OperationHandle>, RecoveryError> {
        let planned = self.plan(failed, classification, records_in_flight, receiver)?;
        let handles: Vec<OperationHandle> = planned.iter().map(Operation::handle).collect();

        let mut submitted: Vec<OperationHandle> = Vec::with_capacity(planned.len());
        for replacement in planned.into_iter().rev() {
            let outcome = guard
                .check(Checkpoint::Resubmission)
                .map_err(RecoveryError::from)
                .and_then(|()| self.queue.submit(replacement).map_err(RecoveryError::from));

            match outcome {
                Ok(handle) => submitted.push(handle),
                Err(error) => {
                    // Dependents already queued would otherwise wait forever
                    for handle in &submitted {
                        handle.cancel();
                    }
                    return Err(error);
                }
            }
        }

        if !handles.is_empty() {
            info!(
                operation_id = %failed.id(),
                category = %classification.category,
                replacements = handles.len(),
                queue = %self.queue.queue_name(),
                "Replacement operations submitted"
            );
        }
        Ok(handles)
    }

    /// Classify, recover where possible, and announce.
    ///
    /// `guard` belongs to whoever drives recovery (e.g. the recovery worker's
    /// shutdown). A cancelled guard on entry drops the failure untouched. The
    /// failed operation's own cancellation only stops resubmission.
    pub fn handle(&self, failure: FailedOperation, guard: &CancellationGuard) -> RecoveryOutcome {
        if guard.check(Checkpoint::Resubmission).is_err() {
            return RecoveryOutcome {
                classification: None,
                replacements: Vec::new(),
                status: RecoveryStatus::Cancelled,
            };
        }

        let FailedOperation {
            operation,
            error,
            records_in_flight,
        } = failure;

        let context = ErrorContext::for_operation(&operation);
        let classification = self.classifier.classify_error(&error, &context);

        let (replacements, status) = if self.attempts(classification.category, operation.kind()) {
            let receiver = operation.receiver().cloned();
            let recovered = if operation.is_cancelled() {
                Err(RecoveryError::Cancelled(Cancelled {
                    operation_id: operation.id(),
                    checkpoint: Checkpoint::Resubmission,
                }))
            } else {
                self.recover(&operation, &classification, &records_in_flight, receiver, guard)
            };
            match recovered {
                Ok(handles) => (handles, RecoveryStatus::Recovered),
                Err(RecoveryError::Cancelled(cancelled)) => {
                    info!(
                        operation_id = %operation.id(),
                        checkpoint = %cancelled.checkpoint,
                        "Resubmission cancelled"
                    );
                    (Vec::new(), RecoveryStatus::Cancelled)
                }
                Err(recovery_error) => {
                    error!(
                        operation_id = %operation.id(),
                        operation_name = %operation.name(),
                        category = %classification.category,
                        error = %recovery_error,
                        "Recoverable failure went unhandled"
                    );
                    (Vec::new(), RecoveryStatus::Unrecovered(recovery_error))
                }
            }
        } else {
            warn!(
                operation_id = %operation.id(),
                operation_name = %operation.name(),
                category = %classification.category,
                error = %error,
                "Failure not recovered by this layer"
            );
            (Vec::new(), RecoveryStatus::NotAttempted)
        };

        self.broadcaster.announce(&classification);
        if matches!(status, RecoveryStatus::Unrecovered(_)) {
            self.broadcaster
                .announce_as(NotificationName::UNRECOVERED, &classification);
        }

        RecoveryOutcome {
            classification: Some(classification),
            replacements,
            status,
        }
    }
}

/// Recover inline on the reporting task. Deterministic; meant for tests and
/// single-threaded embedding where a separate recovery queue is not wanted.
impl FailureSink for RecoveryStrategy {
    fn report(&self, failure: FailedOperation) {
        let guard = CancellationGuard::new(failure.operation.id(), CancellationToken::new());
        self.handle(failure, &guard);
    }
}

impl fmt::Debug for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryStrategy")
            .field("classifier", &self.classifier.classifier_name())
            .field("queue", &self.queue.queue_name())
            .field("settings", &self.settings)
            .finish()
    }
}
