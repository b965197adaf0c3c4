//! # Execution Queues
//!
//! Operations run on explicitly constructed, injected queues rather than
//! process-wide singletons.
//!
//! - [`OperationQueue`]: tokio-backed, concurrent up to a permit limit,
//!   honouring dependency edges
//! - [`ManualQueue`]: deterministic queue for tests; operations run only when
//!   driven, one at a time, in submission order among ready operations
//! - [`RecoveryQueue`]: dedicated worker that hands failed operations to the
//!   recovery strategy, so recovery never waits behind primary backlog

pub mod manual_queue;
pub mod operation_queue;
pub mod queue;
pub mod recovery_queue;

pub use manual_queue::ManualQueue;
pub use operation_queue::OperationQueue;
pub use queue::{ExecutionQueue, QueueError};
pub use recovery_queue::{RecoveryInbox, RecoveryQueue};
