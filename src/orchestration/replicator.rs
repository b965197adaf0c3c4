//! # Operation Replication
//!
//! Builds a fresh, unexecuted operation from a spent one.
//!
//! Replication dispatches on the source's [`OperationKind`] tag. For every
//! registered kind it copies what defines intended behaviour (target
//! database, query, result limit, record payload, receiver reference,
//! completion and per-item callbacks, the ignore-unknown-item flag, and the
//! name with a replica suffix) and leaves out execution state: the replica
//! gets a new id, a new cancellation flag, starts `Pending`, and has no
//! dependencies. Callbacks are shared by reference and never invoked here.

use crate::constants::REPLICA_NAME_SUFFIX;
use crate::operation::{Operation, OperationKind, OperationSpec};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Produces replacement operations for spent ones
pub trait OperationReplicator: Send + Sync {
    /// A fresh operation equivalent to `source`, or `None` if its kind is not registered
    fn replicate(&self, source: &Operation) -> Option<Operation>;

    /// Whether operations of `kind` can be replicated
    fn supports(&self, kind: OperationKind) -> bool;
}

/// Replicator for the built-in operation variants
#[derive(Debug, Clone)]
pub struct StandardReplicator {
    registered: HashSet<OperationKind>,
    name_suffix: String,
}

impl StandardReplicator {
    /// Replicator with every built-in kind registered
    pub fn new() -> Self {
        Self {
            registered: OperationKind::ALL.into_iter().collect(),
            name_suffix: REPLICA_NAME_SUFFIX.to_string(),
        }
    }

    /// Replicator with nothing registered
    pub fn empty() -> Self {
        Self {
            registered: HashSet::new(),
            name_suffix: REPLICA_NAME_SUFFIX.to_string(),
        }
    }

    pub fn with(mut self, kind: OperationKind) -> Self {
        self.registered.insert(kind);
        self
    }

    /// Deregister `kind`; its operations become non-recoverable
    pub fn without(mut self, kind: OperationKind) -> Self {
        self.registered.remove(&kind);
        self
    }

    pub fn with_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = suffix.into();
        self
    }

    fn copy_spec(source: &OperationSpec) -> OperationSpec {
        match source {
            OperationSpec::Upload(spec) => OperationSpec::Upload(spec.clone()),
            OperationSpec::Delete(spec) => OperationSpec::Delete(spec.clone()),
            OperationSpec::Download(spec) => OperationSpec::Download(spec.clone()),
            OperationSpec::Notify(spec) => OperationSpec::Notify(spec.clone()),
        }
    }
}

impl Default for StandardReplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationReplicator for StandardReplicator {
    fn replicate(&self, source: &Operation) -> Option<Operation> {
        let kind = source.kind();
        if !self.registered.contains(&kind) {
            warn!(
                operation_id = %source.id(),
                operation_name = %source.name(),
                kind = %kind,
                "Operation kind not registered for replication"
            );
            return None;
        }

        let replica = Operation::from_parts(
            format!("{}{}", source.name(), self.name_suffix),
            Self::copy_spec(source.spec()),
            source.receiver().cloned(),
            source.completion().cloned(),
            source.ignores_unknown_item(),
        );

        debug!(
            source_id = %source.id(),
            replica_id = %replica.id(),
            replica_name = %replica.name(),
            kind = %kind,
            "Operation replicated"
        );

        Some(replica)
    }

    fn supports(&self, kind: OperationKind) -> bool {
        self.registered.contains(&kind)
    }
}
