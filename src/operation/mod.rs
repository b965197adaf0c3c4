//! # Operations
//!
//! An [`Operation`] is an asynchronous, cancellable, nameable unit of work
//! against the remote store. It carries a variant-specific configuration
//! ([`OperationSpec`]), an optional completion callback, an optional receiver
//! for produced records, and the handles of operations it must wait for.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──▶ Executing ──▶ Completed | Failed | Cancelled
//!    └────────────────────────────────────────▶ Cancelled
//! ```
//!
//! An operation runs its body at most once. It is moved into the queue that
//! executes it, and the state machine rejects a second `Executing`
//! transition. Recovery never reuses a spent instance; it builds a new one
//! through the replicator.

pub mod cancellation;
pub mod handle;
pub mod state;
pub mod variant;

pub use cancellation::{CancellationGuard, Cancelled, Checkpoint};
pub use handle::OperationHandle;
pub use state::OperationState;
pub use variant::{
    DeleteSpec, DownloadSpec, NotifySpec, OperationKind, OperationSpec, UnknownItemAction,
    UploadSpec,
};

use crate::events::NotificationName;
use crate::models::{Database, Query, Record, RemoteError};
use crate::remote::Receiver;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Invoked once when an operation reaches a terminal state
pub type CompletionCallback = Arc<dyn Fn(&OperationReport) + Send + Sync>;

/// Identity snapshot of an operation, safe to keep after the operation is gone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
    pub id: Uuid,
    pub name: String,
    pub kind: OperationKind,
}

impl fmt::Display for OperationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.name, self.id)
    }
}

/// What a completion callback is told
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub operation: OperationRef,
    pub state: OperationState,
    pub error: Option<RemoteError>,
}

/// A unit of remote work scheduled on an execution queue
pub struct Operation {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    spec: OperationSpec,
    receiver: Option<Arc<dyn Receiver>>,
    completion: Option<CompletionCallback>,
    ignore_unknown_item: bool,
    dependencies: Vec<OperationHandle>,
    handle: OperationHandle,
    single_record_retry: bool,
}

impl Operation {
    /// Create a pending operation for `spec` with a descriptive default name
    pub fn new(spec: OperationSpec) -> Self {
        let name = spec.describe();
        Self::from_parts(name, spec, None, None, false)
    }

    pub(crate) fn from_parts(
        name: String,
        spec: OperationSpec,
        receiver: Option<Arc<dyn Receiver>>,
        completion: Option<CompletionCallback>,
        ignore_unknown_item: bool,
    ) -> Self {
        let id = Uuid::new_v4();
        let handle = OperationHandle::new(id, spec.kind());
        Self {
            id,
            name,
            created_at: Utc::now(),
            spec,
            receiver,
            completion,
            ignore_unknown_item,
            dependencies: Vec::new(),
            handle,
            single_record_retry: false,
        }
    }

    /// Save `records` to `database`
    pub fn upload(records: Vec<Record>, database: Database) -> Self {
        Self::new(OperationSpec::Upload(UploadSpec { records, database }))
    }

    /// Delete `records` from `database`
    pub fn delete(records: Vec<Record>, database: Database) -> Self {
        Self::new(OperationSpec::Delete(DeleteSpec {
            records,
            database,
            delay: None,
        }))
    }

    /// Download records matching `query` from `database`
    pub fn download(query: Query, database: Database) -> Self {
        Self::new(OperationSpec::Download(DownloadSpec {
            query,
            database,
            limit: None,
            unknown_item_action: None,
        }))
    }

    /// Post notification `name` with `payload` when executed
    pub fn notify(name: NotificationName, payload: Value) -> Self {
        Self::new(OperationSpec::Notify(NotifySpec { name, payload }))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Receiver that successful results are appended to
    pub fn with_receiver(mut self, receiver: Arc<dyn Receiver>) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_completion<F>(mut self, callback: F) -> Self
    where
        F: Fn(&OperationReport) + Send + Sync + 'static,
    {
        self.completion = Some(Arc::new(callback));
        self
    }

    pub fn with_completion_callback(mut self, callback: CompletionCallback) -> Self {
        self.completion = Some(callback);
        self
    }

    /// Result limit for downloads; ignored by other variants
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.spec.set_limit(Some(limit));
        self
    }

    /// Delay before the remote call of a delete; ignored by other variants
    pub fn with_delay(mut self, delay: Duration) -> Self {
        if let OperationSpec::Delete(spec) = &mut self.spec {
            spec.delay = Some(delay);
        }
        self
    }

    /// Drop items reported as `unknown item` instead of failing
    pub fn with_ignore_unknown_item(mut self, ignore: bool) -> Self {
        self.ignore_unknown_item = ignore;
        self
    }

    /// Callback for dropped unknown items on downloads; ignored by other variants
    pub fn with_unknown_item_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&RemoteError) + Send + Sync + 'static,
    {
        if let OperationSpec::Download(spec) = &mut self.spec {
            spec.unknown_item_action = Some(Arc::new(action));
        }
        self
    }

    /// Builder form of [`Operation::add_dependency`]
    pub fn depends_on(mut self, dependency: &OperationHandle) -> Self {
        self.add_dependency(dependency);
        self
    }

    /// Wait for `dependency` to reach a terminal state before executing
    pub fn add_dependency(&mut self, dependency: &OperationHandle) {
        if dependency.id() == self.id {
            return;
        }
        if self.dependencies.iter().any(|d| d.same_as(dependency)) {
            return;
        }
        self.dependencies.push(dependency.clone());
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn kind(&self) -> OperationKind {
        self.spec.kind()
    }

    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub(crate) fn spec_mut(&mut self) -> &mut OperationSpec {
        &mut self.spec
    }

    pub fn receiver(&self) -> Option<&Arc<dyn Receiver>> {
        self.receiver.as_ref()
    }

    pub fn completion(&self) -> Option<&CompletionCallback> {
        self.completion.as_ref()
    }

    pub fn ignores_unknown_item(&self) -> bool {
        self.ignore_unknown_item
    }

    pub fn dependencies(&self) -> &[OperationHandle] {
        &self.dependencies
    }

    /// Whether `handle` is among this operation's dependencies
    pub fn depends_on_handle(&self, handle: &OperationHandle) -> bool {
        self.dependencies.iter().any(|d| d.same_as(handle))
    }

    /// Whether this is the one-record replacement of a one-record batch that
    /// already failed for size. Such a replacement is not split again.
    pub fn is_single_record_retry(&self) -> bool {
        self.single_record_retry
    }

    pub(crate) fn mark_single_record_retry(&mut self) {
        self.single_record_retry = true;
    }

    pub fn handle(&self) -> OperationHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> OperationState {
        self.handle.state()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Guard checking this operation's cancellation flag
    pub fn guard(&self) -> CancellationGuard {
        CancellationGuard::new(self.id, self.handle.cancellation_token())
    }

    pub fn reference(&self) -> OperationRef {
        OperationRef {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind(),
        }
    }

    /// Move to a terminal state and fire the completion callback.
    ///
    /// Does nothing if the state machine rejects the transition, so the
    /// callback fires at most once.
    pub(crate) fn finish(&self, state: OperationState, error: Option<RemoteError>) -> bool {
        if !state.is_terminal() || !self.handle.transition(state) {
            return false;
        }
        if let Some(callback) = &self.completion {
            callback(&OperationReport {
                operation: self.reference(),
                state,
                error,
            });
        }
        true
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .field("spec", &self.spec)
            .field("state", &self.state())
            .field("has_receiver", &self.receiver.is_some())
            .field("has_completion", &self.completion.is_some())
            .field("ignore_unknown_item", &self.ignore_unknown_item)
            .field("dependencies", &self.dependencies.len())
            .field("single_record_retry", &self.single_record_retry)
            .finish()
    }
}
