//! Deterministic queue that holds operations until told to run them.
//!
//! Used where scheduling must be reproducible: unit tests of recovery, and
//! embedders that drive execution themselves.

use super::queue::{admit, ExecutionQueue, QueueError};
use crate::constants::queues;
use crate::operation::{Operation, OperationHandle};
use crate::orchestration::OperationRunner;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Queue that records submissions and runs them on demand
pub struct ManualQueue {
    name: String,
    pending: Mutex<VecDeque<Operation>>,
    submitted: Mutex<Vec<Uuid>>,
    accept_limit: Option<usize>,
}

impl ManualQueue {
    pub fn new() -> Self {
        Self::named(queues::MANUAL)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            accept_limit: None,
        }
    }

    /// Reject every submission after the first `accepted`
    pub fn reject_after(mut self, accepted: usize) -> Self {
        self.accept_limit = Some(accepted);
        self
    }

    /// Ids of accepted operations, in submission order
    pub fn submission_order(&self) -> Vec<Uuid> {
        self.submitted.lock().clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Remove and return everything not yet run
    pub fn take_pending(&self) -> Vec<Operation> {
        self.pending.lock().drain(..).collect()
    }

    fn next_ready(&self) -> Option<Operation> {
        let mut pending = self.pending.lock();
        let position = pending.iter().position(|operation| {
            operation.is_cancelled()
                || operation
                    .dependencies()
                    .iter()
                    .all(OperationHandle::is_terminal)
        })?;
        pending.remove(position)
    }

    /// Run pending operations one at a time until none is ready.
    ///
    /// An operation is ready once all its dependencies are terminal, or once
    /// it is cancelled. Operations submitted while running (recovery
    /// replacements) are picked up in the same call. Returns how many ran.
    pub async fn run_until_idle(&self, runner: &OperationRunner) -> usize {
        let mut ran = 0;
        while let Some(operation) = self.next_ready() {
            debug!(
                queue = %self.name,
                operation_id = %operation.id(),
                operation_name = %operation.name(),
                "Running queued operation"
            );
            runner.execute(operation).await;
            ran += 1;
        }

        let stuck = self.pending_len();
        if stuck > 0 {
            warn!(
                queue = %self.name,
                pending = stuck,
                "Operations left waiting on dependencies outside this queue"
            );
        }
        ran
    }
}

impl Default for ManualQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionQueue for ManualQueue {
    fn submit(&self, operation: Operation) -> Result<OperationHandle, QueueError> {
        if let Some(limit) = self.accept_limit {
            if self.submitted.lock().len() >= limit {
                return Err(QueueError::Rejected {
                    queue: self.name.clone(),
                    reason: format!("accepts at most {limit} operations"),
                });
            }
        }
        admit(&self.name, &operation)?;

        let handle = operation.handle();
        self.submitted.lock().push(handle.id());
        self.pending.lock().push_back(operation);
        Ok(handle)
    }

    fn queue_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ManualQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualQueue")
            .field("name", &self.name)
            .field("pending", &self.pending_len())
            .field("submitted", &self.submitted.lock().len())
            .finish()
    }
}
