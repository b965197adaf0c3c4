//! Variant-specific operation configuration.
//!
//! Each operation carries exactly one [`OperationSpec`]; its
//! [`OperationKind`] tag is what the replicator and recovery strategy
//! dispatch on.

use crate::events::NotificationName;
use crate::models::{Database, Query, Record, RecordId, RemoteError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Invoked when an ignored `unknown item` error drops an item from a download
pub type UnknownItemAction = Arc<dyn Fn(&RemoteError) + Send + Sync>;

/// Tag identifying an operation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Upload,
    Delete,
    Download,
    Notify,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [Self::Upload, Self::Delete, Self::Download, Self::Notify];

    /// Batch writes carry a record payload that recovery may split
    pub fn is_batch_write(&self) -> bool {
        matches!(self, Self::Upload | Self::Delete)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Delete => write!(f, "delete"),
            Self::Download => write!(f, "download"),
            Self::Notify => write!(f, "notify"),
        }
    }
}

/// Save a batch of records
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSpec {
    pub records: Vec<Record>,
    pub database: Database,
}

/// Delete a batch of records, optionally after a delay
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSpec {
    pub records: Vec<Record>,
    pub database: Database,
    pub delay: Option<Duration>,
}

impl DeleteSpec {
    pub fn record_ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|record| record.id.clone()).collect()
    }
}

/// Query records into the operation's receiver
#[derive(Clone)]
pub struct DownloadSpec {
    pub query: Query,
    pub database: Database,
    pub limit: Option<usize>,
    pub unknown_item_action: Option<UnknownItemAction>,
}

impl fmt::Debug for DownloadSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadSpec")
            .field("query", &self.query)
            .field("database", &self.database)
            .field("limit", &self.limit)
            .field("unknown_item_action", &self.unknown_item_action.is_some())
            .finish()
    }
}

/// Post a named notification when executed
#[derive(Debug, Clone, PartialEq)]
pub struct NotifySpec {
    pub name: NotificationName,
    pub payload: Value,
}

/// Configuration payload of an operation, one variant per [`OperationKind`]
#[derive(Debug, Clone)]
pub enum OperationSpec {
    Upload(UploadSpec),
    Delete(DeleteSpec),
    Download(DownloadSpec),
    Notify(NotifySpec),
}

impl OperationSpec {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Upload(_) => OperationKind::Upload,
            Self::Delete(_) => OperationKind::Delete,
            Self::Download(_) => OperationKind::Download,
            Self::Notify(_) => OperationKind::Notify,
        }
    }

    /// Record payload of a batch write; empty for other variants
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Upload(spec) => &spec.records,
            Self::Delete(spec) => &spec.records,
            Self::Download(_) | Self::Notify(_) => &[],
        }
    }

    /// Replace the record payload. Returns `false` for variants without one.
    pub fn set_records(&mut self, records: Vec<Record>) -> bool {
        match self {
            Self::Upload(spec) => {
                spec.records = records;
                true
            }
            Self::Delete(spec) => {
                spec.records = records;
                true
            }
            Self::Download(_) | Self::Notify(_) => false,
        }
    }

    /// Result limit of a download
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Download(spec) => spec.limit,
            _ => None,
        }
    }

    /// Set the result limit. Returns `false` for variants without one.
    pub fn set_limit(&mut self, limit: Option<usize>) -> bool {
        match self {
            Self::Download(spec) => {
                spec.limit = limit;
                true
            }
            _ => false,
        }
    }

    pub fn database(&self) -> Option<Database> {
        match self {
            Self::Upload(spec) => Some(spec.database),
            Self::Delete(spec) => Some(spec.database),
            Self::Download(spec) => Some(spec.database),
            Self::Notify(_) => None,
        }
    }

    /// Short description used for default operation names
    pub fn describe(&self) -> String {
        match self {
            Self::Upload(spec) => format!("upload {} records to {}", spec.records.len(), spec.database),
            Self::Delete(spec) => format!("delete {} records from {}", spec.records.len(), spec.database),
            Self::Download(spec) => format!("download {} from {}", spec.query, spec.database),
            Self::Notify(spec) => format!("notify {}", spec.name),
        }
    }
}
