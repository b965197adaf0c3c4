//! # Remote Store Seams
//!
//! The collaborators the resilience core talks to but does not implement:
//! the transport to the remote record store, and the caller-owned sink that
//! accumulates records produced by successful operations.

pub mod receiver;

pub use receiver::{MemoryReceiver, Receiver};

use crate::models::{Database, Query, Record, RecordId, RemoteError};
use async_trait::async_trait;

/// Transport to the remote record store.
///
/// Implementations own wire format, authentication and record mapping. Each
/// call is a single remote request; the resilience core never calls it twice
/// for the same operation instance.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Save a batch of records, returning the records as stored
    async fn save(&self, database: Database, records: &[Record]) -> Result<Vec<Record>, RemoteError>;

    /// Delete a batch of records by id, returning the ids actually deleted
    async fn delete(&self, database: Database, ids: &[RecordId]) -> Result<Vec<RecordId>, RemoteError>;

    /// Run a query, returning at most `limit` records when a limit is set
    async fn query(
        &self,
        database: Database,
        query: &Query,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, RemoteError>;

    /// Name used in logs
    fn store_name(&self) -> &'static str {
        "remote_store"
    }
}
