//! Cooperative cancellation checkpoints.
//!
//! Every side-effecting step of an operation (queue submission, dependency
//! wait, delay, remote call, recovery resubmission) goes through the same
//! [`CancellationGuard`], so no checkpoint can be skipped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Side-effecting step guarded by a cancellation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    QueueSubmission,
    DependencyWait,
    Delay,
    RemoteCall,
    Resubmission,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueSubmission => write!(f, "queue_submission"),
            Self::DependencyWait => write!(f, "dependency_wait"),
            Self::Delay => write!(f, "delay"),
            Self::RemoteCall => write!(f, "remote_call"),
            Self::Resubmission => write!(f, "resubmission"),
        }
    }
}

/// Raised when a checkpoint observes the cancellation flag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation {operation_id} cancelled at {checkpoint}")]
pub struct Cancelled {
    pub operation_id: Uuid,
    pub checkpoint: Checkpoint,
}

/// Checks one operation's cancellation flag at each checkpoint
#[derive(Debug, Clone)]
pub struct CancellationGuard {
    operation_id: Uuid,
    token: CancellationToken,
}

impl CancellationGuard {
    pub fn new(operation_id: Uuid, token: CancellationToken) -> Self {
        Self {
            operation_id,
            token,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail if cancellation was requested before `checkpoint`
    pub fn check(&self, checkpoint: Checkpoint) -> Result<(), Cancelled> {
        if self.token.is_cancelled() {
            debug!(
                operation_id = %self.operation_id,
                checkpoint = %checkpoint,
                "Cancellation observed, skipping side effect"
            );
            return Err(Cancelled {
                operation_id: self.operation_id,
                checkpoint,
            });
        }
        Ok(())
    }

    /// Check, then drive `future` to completion unless cancellation arrives first.
    ///
    /// Only use for suspension points whose abandonment has no side effects
    /// (dependency waits, delays).
    pub async fn suspend<F>(&self, checkpoint: Checkpoint, future: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        self.check(checkpoint)?;
        tokio::select! {
            biased;
            () = self.token.cancelled() => {
                debug!(
                    operation_id = %self.operation_id,
                    checkpoint = %checkpoint,
                    "Cancelled while suspended"
                );
                Err(Cancelled {
                    operation_id: self.operation_id,
                    checkpoint,
                })
            }
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_check_passes_until_cancelled() {
        let token = CancellationToken::new();
        let guard = CancellationGuard::new(Uuid::new_v4(), token.clone());

        assert!(guard.check(Checkpoint::RemoteCall).is_ok());
        token.cancel();

        let err = guard.check(Checkpoint::RemoteCall).unwrap_err();
        assert_eq!(err.checkpoint, Checkpoint::RemoteCall);
        assert!(guard.is_cancelled());
    }

    #[tokio::test]
    async fn test_suspend_aborts_on_cancel() {
        let token = CancellationToken::new();
        let guard = CancellationGuard::new(Uuid::new_v4(), token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = guard
            .suspend(Checkpoint::Delay, tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert_eq!(result.unwrap_err().checkpoint, Checkpoint::Delay);
    }

    #[tokio::test]
    async fn test_suspend_returns_output() {
        let guard = CancellationGuard::new(Uuid::new_v4(), CancellationToken::new());
        let value = guard
            .suspend(Checkpoint::DependencyWait, async { 42 })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }
}
