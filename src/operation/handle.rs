use super::{OperationKind, OperationState};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

/// Shared view of one operation's execution state and cancellation flag.
///
/// Handles are what dependents wait on and what callers keep after the
/// operation itself has been moved into a queue.
#[derive(Clone)]
pub struct OperationHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: Uuid,
    kind: OperationKind,
    state: watch::Sender<OperationState>,
    cancel: CancellationToken,
}

impl OperationHandle {
    pub(crate) fn new(id: Uuid, kind: OperationKind) -> Self {
        let (state, _) = watch::channel(OperationState::Pending);
        Self {
            inner: Arc::new(HandleInner {
                id,
                kind,
                state,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn kind(&self) -> OperationKind {
        self.inner.kind
    }

    pub fn state(&self) -> OperationState {
        *self.inner.state.borrow()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Request cancellation. The flag is monotonic: once set it stays set.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Move to `next` if the state machine allows it. Returns whether the state changed.
    pub(crate) fn transition(&self, next: OperationState) -> bool {
        let mut rejected_from = None;
        let changed = self.inner.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                *current = next;
                true
            } else {
                rejected_from = Some(*current);
                false
            }
        });

        if let Some(from) = rejected_from {
            warn!(
                operation_id = %self.inner.id,
                from = %from,
                to = %next,
                "Rejected illegal operation state transition"
            );
        }
        changed
    }

    /// Wait until the operation reaches Completed, Cancelled or Failed
    pub async fn wait_terminal(&self) -> OperationState {
        let mut rx = self.inner.state.subscribe();
        let state = match rx.wait_for(OperationState::is_terminal).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }

    /// Whether two handles refer to the same operation
    pub fn same_as(&self, other: &OperationHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transitions_follow_state_machine() {
        let handle = OperationHandle::new(Uuid::new_v4(), OperationKind::Upload);

        assert!(!handle.transition(OperationState::Completed));
        assert!(handle.transition(OperationState::Executing));
        assert!(!handle.transition(OperationState::Executing));
        assert!(handle.transition(OperationState::Failed));
        assert!(!handle.transition(OperationState::Executing));
        assert_eq!(handle.state(), OperationState::Failed);
    }

    #[test]
    fn test_cancel_is_monotonic_and_shared() {
        let handle = OperationHandle::new(Uuid::new_v4(), OperationKind::Download);
        let other = handle.clone();

        other.cancel();
        other.cancel();
        assert!(handle.is_cancelled());
        assert!(handle.same_as(&other));
    }

    #[tokio::test]
    async fn test_wait_terminal_wakes_on_completion() {
        let handle = OperationHandle::new(Uuid::new_v4(), OperationKind::Delete);
        let driver = handle.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            driver.transition(OperationState::Executing);
            driver.transition(OperationState::Completed);
        });

        let state = tokio::time::timeout(Duration::from_secs(2), handle.wait_terminal())
            .await
            .unwrap();
        assert_eq!(state, OperationState::Completed);
    }

    #[test]
    fn test_wait_terminal_returns_immediately_when_done() {
        let handle = OperationHandle::new(Uuid::new_v4(), OperationKind::Notify);
        handle.transition(OperationState::Cancelled);

        assert_eq!(
            tokio_test::block_on(handle.wait_terminal()),
            OperationState::Cancelled
        );
    }
}
