//! # Remote Store Models
//!
//! Plain data types shared between the resilience core and its collaborators:
//! records and their identifiers, target databases, queries, and the remote
//! error representation the classifier consumes.

pub mod query;
pub mod record;
pub mod remote_error;

pub use query::{Predicate, Query};
pub use record::{Database, Record, RecordId};
pub use remote_error::{Implicated, RemoteError, RemoteErrorCode, UnrecognizedCode};
