//! # Operation Queue
//!
//! Tokio-backed execution queue. Each submitted operation gets its own task
//! that waits for dependencies, takes a concurrency permit, and runs the body
//! through the shared [`OperationRunner`].

use super::queue::{admit, ExecutionQueue, QueueError};
use crate::operation::{Cancelled, Checkpoint, Operation, OperationHandle};
use crate::orchestration::OperationRunner;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info};
use uuid::Uuid;

/// Concurrent queue running operations on the ambient tokio runtime
#[derive(Clone)]
pub struct OperationQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    name: String,
    runner: Arc<OperationRunner>,
    permits: Arc<Semaphore>,
    concurrency: usize,
    in_flight: DashMap<Uuid, OperationHandle>,
    idle: Notify,
    closed: AtomicBool,
}

impl OperationQueue {
    pub fn new(name: impl Into<String>, runner: Arc<OperationRunner>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            inner: Arc::new(QueueInner {
                name: name.into(),
                runner,
                permits: Arc::new(Semaphore::new(concurrency)),
                concurrency,
                in_flight: DashMap::new(),
                idle: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Operations submitted and not yet terminal
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Request cancellation of every in-flight operation
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.inner.in_flight.iter() {
            entry.value().cancel();
            cancelled += 1;
        }
        if cancelled > 0 {
            info!(queue = %self.inner.name, cancelled = cancelled, "Cancelled in-flight operations");
        }
        cancelled
    }

    /// Stop accepting submissions. Already queued operations still run.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            info!(queue = %self.inner.name, "Queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Wait until no submitted operation is still in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.in_flight.is_empty() {
                return;
            }
            notified.await;
        }
    }

    async fn drive(inner: Arc<QueueInner>, operation: Operation) {
        let id = operation.id();
        Self::execute(&inner, operation).await;

        inner.in_flight.remove(&id);
        if inner.in_flight.is_empty() {
            inner.idle.notify_waiters();
        }
    }

    async fn execute(inner: &QueueInner, operation: Operation) {
        if let Err(cancelled) = inner.runner.await_dependencies(&operation).await {
            inner.runner.abandon(operation, cancelled);
            return;
        }

        let guard = operation.guard();
        let permit = match guard
            .suspend(Checkpoint::RemoteCall, inner.permits.clone().acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                let cancelled = Cancelled {
                    operation_id: operation.id(),
                    checkpoint: Checkpoint::RemoteCall,
                };
                inner.runner.abandon(operation, cancelled);
                return;
            }
            Err(cancelled) => {
                inner.runner.abandon(operation, cancelled);
                return;
            }
        };

        let state = inner.runner.run(operation).await;
        drop(permit);
        debug!(queue = %inner.name, state = %state, "Operation left queue");
    }
}

impl ExecutionQueue for OperationQueue {
    fn submit(&self, operation: Operation) -> Result<OperationHandle, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed {
                queue: self.inner.name.clone(),
            });
        }
        admit(&self.inner.name, &operation)?;

        let runtime = Handle::try_current().map_err(|_| QueueError::RuntimeUnavailable {
            queue: self.inner.name.clone(),
        })?;

        let handle = operation.handle();
        self.inner.in_flight.insert(handle.id(), handle.clone());
        debug!(
            queue = %self.inner.name,
            operation_id = %operation.id(),
            operation_name = %operation.name(),
            dependencies = operation.dependencies().len(),
            "Operation submitted"
        );

        let inner = self.inner.clone();
        runtime.spawn(Self::drive(inner, operation));
        Ok(handle)
    }

    fn queue_name(&self) -> &str {
        &self.inner.name
    }
}

impl fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQueue")
            .field("name", &self.inner.name)
            .field("concurrency", &self.inner.concurrency)
            .field("in_flight", &self.inner.in_flight.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
