//! # Remote Error Classification
//!
//! Maps a remote error, plus the context of the operation that produced it,
//! to exactly one [`ErrorCategory`].
//!
//! ## Overview
//!
//! Classification is a pure, total function: every defined
//! [`RemoteErrorCode`] has a fixed category and anything unrecognised fails
//! closed as [`ErrorCategory::Fatal`]. The category decides what happens next:
//!
//! | Category          | Recovered here            | Broadcast |
//! |-------------------|---------------------------|-----------|
//! | `Unauthenticated` | no                        | yes       |
//! | `RecordConflict`  | no (caller policy)        | yes       |
//! | `LimitExceeded`   | yes, batch split / halve  | yes       |
//! | `BatchFailure`    | batch writes only         | yes       |
//! | `PartialFailure`  | batch writes only         | yes       |
//! | `Retriable`       | no (caller owns backoff)  | yes       |
//! | `Fatal`           | no                        | yes       |
//! | `SharingError`    | no                        | yes       |
//!
//! ## Usage
//!
//! ```rust
//! use resilient_records::models::{RemoteError, RemoteErrorCode};
//! use resilient_records::operation::{OperationKind, OperationRef};
//! use resilient_records::orchestration::error_classifier::{classify, ErrorCategory, ErrorContext};
//! use uuid::Uuid;
//!
//! let context = ErrorContext::new(OperationRef {
//!     id: Uuid::new_v4(),
//!     name: "nightly upload".to_string(),
//!     kind: OperationKind::Upload,
//! });
//! let error = RemoteError::new(RemoteErrorCode::LimitExceeded, "request too large");
//!
//! let classification = classify(&error, &context);
//! assert_eq!(classification.category, ErrorCategory::LimitExceeded);
//! ```

use crate::models::{Implicated, RemoteError, RemoteErrorCode};
use crate::operation::{Operation, OperationRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Failure categories, closed over every remote error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Caller is not signed in to the remote store
    Unauthenticated,
    /// Server-side version of a record changed underneath the write
    RecordConflict,
    /// Request payload or result count too large
    LimitExceeded,
    /// Whole batch rejected because one item failed
    BatchFailure,
    /// Some items of a batch failed
    PartialFailure,
    /// Transient network or service condition
    Retriable,
    /// Will not succeed without intervention
    Fatal,
    /// Sharing participants or share state rejected
    SharingError,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 8] = [
        Self::Unauthenticated,
        Self::RecordConflict,
        Self::LimitExceeded,
        Self::BatchFailure,
        Self::PartialFailure,
        Self::Retriable,
        Self::Fatal,
        Self::SharingError,
    ];

    /// Capacity-related categories the batch splitter may recover
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::LimitExceeded | Self::BatchFailure | Self::PartialFailure
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::RecordConflict => write!(f, "Record Conflict"),
            Self::LimitExceeded => write!(f, "Limit Exceeded"),
            Self::BatchFailure => write!(f, "Batch Failure"),
            Self::PartialFailure => write!(f, "Partial Failure"),
            Self::Retriable => write!(f, "Retriable"),
            Self::Fatal => write!(f, "Fatal"),
            Self::SharingError => write!(f, "Sharing Error"),
        }
    }
}

/// Context of the operation an error came from
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    /// Operation that produced the error
    pub operation: OperationRef,

    /// Record or field the caller already knows is responsible
    pub implicated: Option<Implicated>,

    /// Caller opted in to dropping `unknown item` failures
    pub ignore_unknown_item: bool,
}

impl ErrorContext {
    pub fn new(operation: OperationRef) -> Self {
        Self {
            operation,
            implicated: None,
            ignore_unknown_item: false,
        }
    }

    /// Context for a failure of `operation`
    pub fn for_operation(operation: &Operation) -> Self {
        Self {
            operation: operation.reference(),
            implicated: None,
            ignore_unknown_item: operation.ignores_unknown_item(),
        }
    }

    /// Whether an error with `code` should be dropped rather than classified
    pub fn suppresses(&self, code: RemoteErrorCode) -> bool {
        self.ignore_unknown_item && code == RemoteErrorCode::UnknownItem
    }
}

/// Result of classifying one failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub category: ErrorCategory,

    /// Operation that produced the error
    pub operation: OperationRef,

    /// Raw remote error payload
    pub error: RemoteError,

    /// Record or field implicated, from the error or the context
    pub implicated: Option<Implicated>,

    pub classified_at: DateTime<Utc>,
}

/// Fixed category for a remote error code
pub fn category_for(code: RemoteErrorCode) -> ErrorCategory {
    use RemoteErrorCode as Code;

    match code {
        Code::NotAuthenticated => ErrorCategory::Unauthenticated,
        Code::ServerRecordChanged => ErrorCategory::RecordConflict,
        Code::LimitExceeded => ErrorCategory::LimitExceeded,
        Code::BatchRequestFailed => ErrorCategory::BatchFailure,
        Code::PartialFailure => ErrorCategory::PartialFailure,
        Code::NetworkUnavailable
        | Code::NetworkFailure
        | Code::ServiceUnavailable
        | Code::RequestRateLimited
        | Code::ZoneBusy
        | Code::ResultsTruncated => ErrorCategory::Retriable,
        Code::AlreadyShared | Code::TooManyParticipants => ErrorCategory::SharingError,
        Code::InternalError
        | Code::BadContainer
        | Code::MissingEntitlement
        | Code::PermissionFailure
        | Code::UnknownItem
        | Code::InvalidArguments
        | Code::ServerRejectedRequest
        | Code::AssetFileNotFound
        | Code::AssetFileModified
        | Code::IncompatibleVersion
        | Code::ConstraintViolation
        | Code::OperationCancelled
        | Code::ChangeTokenExpired
        | Code::BadDatabase
        | Code::QuotaExceeded
        | Code::ZoneNotFound
        | Code::UserDeletedZone
        | Code::ReferenceViolation
        | Code::ManagedAccountRestricted
        | Code::ParticipantMayNeedVerification
        | Code::ServerResponseLost
        | Code::Unrecognized(_) => ErrorCategory::Fatal,
    }
}

/// Classify `error` raised by the operation described in `context`
pub fn classify(error: &RemoteError, context: &ErrorContext) -> ErrorClassification {
    build_classification(category_for(error.code), error, context)
}

/// Like [`classify`], but `None` when the context suppresses the error
pub fn classify_failure(error: &RemoteError, context: &ErrorContext) -> Option<ErrorClassification> {
    if context.suppresses(error.code) {
        return None;
    }
    Some(classify(error, context))
}

fn build_classification(
    category: ErrorCategory,
    error: &RemoteError,
    context: &ErrorContext,
) -> ErrorClassification {
    ErrorClassification {
        category,
        operation: context.operation.clone(),
        error: error.clone(),
        implicated: error
            .implicated
            .clone()
            .or_else(|| context.implicated.clone()),
        classified_at: Utc::now(),
    }
}

/// Trait for error classification strategies
pub trait ErrorClassifier: Send + Sync {
    /// Classify an error. Must be total.
    fn classify_error(&self, error: &RemoteError, context: &ErrorContext) -> ErrorClassification;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

/// Table-driven classifier with optional per-code overrides
#[derive(Debug, Clone, Default)]
pub struct StandardErrorClassifier {
    overrides: HashMap<RemoteErrorCode, ErrorCategory>,
}

impl StandardErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `code` as `category` instead of its table entry
    pub fn with_override(mut self, code: RemoteErrorCode, category: ErrorCategory) -> Self {
        self.overrides.insert(code, category);
        self
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify_error(&self, error: &RemoteError, context: &ErrorContext) -> ErrorClassification {
        let category = self
            .overrides
            .get(&error.code)
            .copied()
            .unwrap_or_else(|| category_for(error.code));
        build_classification(category, error, context)
    }

    fn classifier_name(&self) -> &'static str {
        "StandardErrorClassifier"
    }
}
