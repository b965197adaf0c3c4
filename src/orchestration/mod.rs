//! # Orchestration
//!
//! The failure-to-recovery pipeline that sits between the execution queues
//! and the remote store.
//!
//! ## Core Components
//!
//! - **OperationRunner**: executes one operation body and reports failures
//! - **ErrorClassifier**: maps a remote error to exactly one [`ErrorCategory`]
//! - **OperationReplicator**: builds a fresh, unexecuted copy of a spent operation
//! - **RecoveryStrategy**: splits batches or halves limits, resubmits, and announces
//!
//! ## Flow
//!
//! ```text
//! OperationRunner ──Failed──▶ FailureSink (RecoveryQueue)
//!                                  │
//!                                  ▼
//!                          RecoveryStrategy ──classify──▶ ErrorCategory
//!                             │        │
//!                  replicate + split   └──announce──▶ NotificationBroadcaster
//!                             │
//!                             ▼
//!                      ExecutionQueue::submit
//! ```

pub mod error_classifier;
pub mod recovery;
pub mod replicator;
pub mod runner;

pub use error_classifier::{
    category_for, classify, classify_failure, ErrorCategory, ErrorClassification,
    ErrorClassifier, ErrorContext, StandardErrorClassifier,
};
pub use recovery::{
    halved_limit, split_batch, RecoveryError, RecoveryOutcome, RecoverySettings, RecoveryStatus,
    RecoveryStrategy,
};
pub use replicator::{OperationReplicator, StandardReplicator};
pub use runner::{FailedOperation, FailureSink, OperationRunner};
