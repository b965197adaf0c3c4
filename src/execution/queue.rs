use crate::operation::{Cancelled, Checkpoint, Operation, OperationHandle, OperationState};
use tracing::debug;

/// Errors that can occur when submitting to a queue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue '{queue}' is closed")]
    Closed { queue: String },

    #[error("Queue '{queue}' needs a running tokio runtime")]
    RuntimeUnavailable { queue: String },

    #[error("Queue '{queue}' rejected submission: {reason}")]
    Rejected { queue: String, reason: String },

    #[error("Submission skipped: {0}")]
    Cancelled(#[from] Cancelled),
}

/// A queue operations are submitted to.
///
/// Implementations provide their own internal synchronisation and must be
/// callable from any thread or task.
pub trait ExecutionQueue: Send + Sync {
    /// Take ownership of `operation` and schedule it.
    ///
    /// An operation whose cancellation flag is already set is not scheduled:
    /// it is finished as `Cancelled` and `QueueError::Cancelled` is returned.
    fn submit(&self, operation: Operation) -> Result<OperationHandle, QueueError>;

    /// Get the queue name for identification
    fn queue_name(&self) -> &str;
}

/// Submission checkpoint shared by every queue implementation
pub(crate) fn admit(queue: &str, operation: &Operation) -> Result<(), QueueError> {
    if let Err(cancelled) = operation.guard().check(Checkpoint::QueueSubmission) {
        debug!(
            queue = %queue,
            operation_id = %operation.id(),
            operation_name = %operation.name(),
            "Cancelled operation not submitted"
        );
        operation.finish(OperationState::Cancelled, None);
        return Err(cancelled.into());
    }
    Ok(())
}
