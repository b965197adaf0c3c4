//! # Recovery Queue
//!
//! Dedicated worker for failed operations. Failures reported by the runner
//! go through an unbounded channel to a single task that runs the
//! [`RecoveryStrategy`], so resubmission never waits behind the primary
//! backlog that caused the failure.

use crate::constants::queues;
use crate::operation::CancellationGuard;
use crate::orchestration::{FailedOperation, FailureSink, RecoveryStatus, RecoveryStrategy};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

struct Shared {
    pending: AtomicUsize,
    idle: Notify,
    shutdown: CancellationToken,
}

impl Shared {
    fn settle_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Sending side: where the runner reports failures
#[derive(Clone)]
pub struct RecoveryQueue {
    sender: mpsc::UnboundedSender<FailedOperation>,
    shared: Arc<Shared>,
}

/// Receiving side, consumed by [`RecoveryInbox::start`]
pub struct RecoveryInbox {
    receiver: mpsc::UnboundedReceiver<FailedOperation>,
    shared: Arc<Shared>,
}

impl RecoveryQueue {
    pub fn channel() -> (RecoveryQueue, RecoveryInbox) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            shutdown: CancellationToken::new(),
        });
        (
            RecoveryQueue {
                sender,
                shared: shared.clone(),
            },
            RecoveryInbox { receiver, shared },
        )
    }

    /// Failures reported and not yet handled
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Wait until every reported failure has been handled
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop the worker. Failures not yet handled are dropped without
    /// resubmission or broadcast.
    pub fn shutdown(&self) {
        if !self.shared.shutdown.is_cancelled() {
            info!(queue = queues::RECOVERY, "Recovery queue shutting down");
            self.shared.shutdown.cancel();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }
}

impl FailureSink for RecoveryQueue {
    fn report(&self, failure: FailedOperation) {
        let operation_id = failure.operation.id();
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(failure).is_err() {
            self.shared.settle_one();
            error!(
                queue = queues::RECOVERY,
                operation_id = %operation_id,
                "Recovery worker gone, failure dropped"
            );
        }
    }
}

impl RecoveryInbox {
    /// Spawn the worker on the current tokio runtime
    pub fn start(self, strategy: Arc<RecoveryStrategy>) -> JoinHandle<()> {
        tokio::spawn(self.run(strategy))
    }

    async fn run(mut self, strategy: Arc<RecoveryStrategy>) {
        info!(queue = queues::RECOVERY, "Recovery worker started");
        loop {
            let failure = tokio::select! {
                biased;
                () = self.shared.shutdown.cancelled() => break,
                failure = self.receiver.recv() => match failure {
                    Some(failure) => failure,
                    None => break,
                },
            };

            let guard = CancellationGuard::new(
                failure.operation.id(),
                self.shared.shutdown.child_token(),
            );
            let outcome = strategy.handle(failure, &guard);
            if let RecoveryStatus::Unrecovered(reason) = &outcome.status {
                debug!(queue = queues::RECOVERY, reason = %reason, "Failure left unrecovered");
            }
            self.shared.settle_one();
        }

        self.receiver.close();
        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
            self.shared.settle_one();
        }
        info!(queue = queues::RECOVERY, dropped = dropped, "Recovery worker stopped");
    }
}

impl fmt::Debug for RecoveryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryQueue")
            .field("pending", &self.pending())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
