use crate::models::Record;
use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only accumulation point for successfully produced records.
///
/// Owned by the caller; operations only hold a shared reference. Only the
/// operation currently executing writes through its reference.
pub trait Receiver: Send + Sync {
    /// Append records. Never clears or reorders what is already held.
    fn receive(&self, records: Vec<Record>);
}

/// In-memory receiver, cheap to clone and share between operations
#[derive(Debug, Clone, Default)]
pub struct MemoryReceiver {
    records: Arc<RwLock<Vec<Record>>>,
}

impl MemoryReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far, in arrival order
    pub fn records(&self) -> Vec<Record> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Receiver for MemoryReceiver {
    fn receive(&self, records: Vec<Record>) {
        if records.is_empty() {
            return;
        }
        self.records.write().extend(records);
    }
}
