#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Resilient Records
//!
//! Failure classification, operation replication and batch-splitting
//! recovery for operations against a remote record store.
//!
//! ## Overview
//!
//! Work against the remote store is expressed as [`Operation`]s (upload,
//! delete, download, notify) submitted to execution queues. When a remote
//! call fails, the error is classified into one of a fixed set of
//! [`ErrorCategory`]s. Capacity failures are recovered automatically:
//!
//! - an oversized batch write is split into two halves, the second depending
//!   on the first, and both are resubmitted;
//! - an oversized download is retried with its result limit halved.
//!
//! Every classified failure is also announced through the
//! [`NotificationBroadcaster`], so callers can react to authentication
//! problems, conflicts or fatal errors without coupling to the core.
//!
//! ## Module Organization
//!
//! - [`models`] - records, queries, target databases and remote errors
//! - [`remote`] - the `RemoteStore` transport seam and record receivers
//! - [`operation`] - operations, their state machine, handles and cancellation
//! - [`orchestration`] - runner, classifier, replicator and recovery strategy
//! - [`execution`] - execution queues (tokio, manual, recovery)
//! - [`events`] - notification catalog and broadcaster
//! - [`runtime`] - everything above wired together
//! - [`config`] - configuration loading
//! - [`error`] - crate-level error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resilient_records::config::ResilienceConfig;
//! use resilient_records::events::NotificationName;
//! use resilient_records::models::{Database, Record};
//! use resilient_records::operation::Operation;
//! use resilient_records::remote::{MemoryReceiver, RemoteStore};
//! use resilient_records::runtime::ResilienceRuntime;
//! use std::sync::Arc;
//!
//! # async fn example(store: Arc<dyn RemoteStore>) -> resilient_records::error::Result<()> {
//! let runtime = ResilienceRuntime::new(store, ResilienceConfig::from_env()?)?;
//! runtime.broadcaster().subscribe(NotificationName::NOT_AUTHENTICATED, |notification| {
//!     eprintln!("sign in again: {:?}", notification.category());
//! });
//!
//! let saved = Arc::new(MemoryReceiver::new());
//! let records = vec![Record::new("note-1", "Note"), Record::new("note-2", "Note")];
//! runtime.submit(Operation::upload(records, Database::Private).with_receiver(saved.clone()))?;
//!
//! runtime.settle().await;
//! println!("saved {} records", saved.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod execution;
pub mod logging;
pub mod models;
pub mod operation;
pub mod orchestration;
pub mod remote;
pub mod runtime;

pub use crate::config::ResilienceConfig;
pub use error::{ResilienceError, Result};
pub use events::{CloudNotification, NotificationBroadcaster, NotificationName};
pub use execution::{ExecutionQueue, ManualQueue, OperationQueue, QueueError, RecoveryQueue};
pub use models::{Database, Query, Record, RecordId, RemoteError, RemoteErrorCode};
pub use operation::{Operation, OperationHandle, OperationKind, OperationState};
pub use orchestration::{
    ErrorCategory, ErrorClassification, OperationReplicator, RecoveryStrategy, StandardReplicator,
};
pub use remote::{MemoryReceiver, Receiver, RemoteStore};
pub use runtime::ResilienceRuntime;
