//! Remote error representation.
//!
//! The remote store reports failures as a stable numeric code plus, where
//! applicable, the record or record field responsible. Codes this crate does
//! not know survive as [`RemoteErrorCode::Unrecognized`] so classification
//! stays total.

use crate::models::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Numeric code with no entry in the known table.
///
/// Only built by [`RemoteErrorCode::from_code`], so it never holds a defined code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnrecognizedCode(i64);

impl UnrecognizedCode {
    pub fn value(&self) -> i64 {
        self.0
    }
}

macro_rules! remote_error_codes {
    ($($variant:ident = $code:literal => $label:literal,)+) => {
        /// Error codes the remote store is known to produce
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "i64", into = "i64")]
        pub enum RemoteErrorCode {
            $($variant,)+
            /// A code outside the known table
            Unrecognized(UnrecognizedCode),
        }

        impl RemoteErrorCode {
            /// Every defined code, in table order
            pub const DEFINED: &'static [RemoteErrorCode] = &[$(RemoteErrorCode::$variant,)+];

            /// Stable numeric identifier
            pub fn code(&self) -> i64 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unrecognized(code) => code.value(),
                }
            }

            /// Resolve a numeric code, falling back to `Unrecognized`
            pub fn from_code(code: i64) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unrecognized(UnrecognizedCode(other)),
                }
            }

            /// Snake-case label used in logs and payloads
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Unrecognized(_) => "unrecognized",
                }
            }
        }
    };
}

remote_error_codes! {
    InternalError = 1 => "internal_error",
    PartialFailure = 2 => "partial_failure",
    NetworkUnavailable = 3 => "network_unavailable",
    NetworkFailure = 4 => "network_failure",
    BadContainer = 5 => "bad_container",
    ServiceUnavailable = 6 => "service_unavailable",
    RequestRateLimited = 7 => "request_rate_limited",
    MissingEntitlement = 8 => "missing_entitlement",
    NotAuthenticated = 9 => "not_authenticated",
    PermissionFailure = 10 => "permission_failure",
    UnknownItem = 11 => "unknown_item",
    InvalidArguments = 12 => "invalid_arguments",
    ResultsTruncated = 13 => "results_truncated",
    ServerRecordChanged = 14 => "server_record_changed",
    ServerRejectedRequest = 15 => "server_rejected_request",
    AssetFileNotFound = 16 => "asset_file_not_found",
    AssetFileModified = 17 => "asset_file_modified",
    IncompatibleVersion = 18 => "incompatible_version",
    ConstraintViolation = 19 => "constraint_violation",
    OperationCancelled = 20 => "operation_cancelled",
    ChangeTokenExpired = 21 => "change_token_expired",
    BatchRequestFailed = 22 => "batch_request_failed",
    ZoneBusy = 23 => "zone_busy",
    BadDatabase = 24 => "bad_database",
    QuotaExceeded = 25 => "quota_exceeded",
    ZoneNotFound = 26 => "zone_not_found",
    LimitExceeded = 27 => "limit_exceeded",
    UserDeletedZone = 28 => "user_deleted_zone",
    TooManyParticipants = 29 => "too_many_participants",
    AlreadyShared = 30 => "already_shared",
    ReferenceViolation = 31 => "reference_violation",
    ManagedAccountRestricted = 32 => "managed_account_restricted",
    ParticipantMayNeedVerification = 33 => "participant_may_need_verification",
    ServerResponseLost = 34 => "server_response_lost",
}

impl From<i64> for RemoteErrorCode {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl From<RemoteErrorCode> for i64 {
    fn from(code: RemoteErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.code())
    }
}

/// The record, and optionally the field, a remote error points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implicated {
    pub record_id: RecordId,
    pub field: Option<String>,
}

/// A failure reported by the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("remote store error {code}: {message}")]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
    pub implicated: Option<Implicated>,
    /// Server-suggested delay, surfaced for callers that own retry timing
    pub retry_after: Option<Duration>,
}

impl RemoteError {
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            implicated: None,
            retry_after: None,
        }
    }

    /// Point the error at a record
    pub fn for_record(mut self, record_id: RecordId) -> Self {
        self.implicated = Some(Implicated {
            record_id,
            field: None,
        });
        self
    }

    /// Point the error at a field of a record
    pub fn for_field(mut self, record_id: RecordId, field: impl Into<String>) -> Self {
        self.implicated = Some(Implicated {
            record_id,
            field: Some(field.into()),
        });
        self
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defined_codes_resolve_to_themselves() {
        for code in RemoteErrorCode::DEFINED {
            assert_eq!(RemoteErrorCode::from_code(code.code()), *code);
        }
        assert_eq!(RemoteErrorCode::DEFINED.len(), 34);
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let code = RemoteErrorCode::from_code(9_999);
        assert!(matches!(code, RemoteErrorCode::Unrecognized(raw) if raw.value() == 9_999));
        assert_eq!(code.code(), 9_999);
        assert_eq!(code.label(), "unrecognized");
    }

    #[test]
    fn test_code_serializes_as_number() {
        let error = RemoteError::new(RemoteErrorCode::LimitExceeded, "too many")
            .for_field(RecordId::new("rec-7"), "payload");

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], serde_json::json!(27));
        assert_eq!(json["implicated"]["field"], serde_json::json!("payload"));

        let back: RemoteError = serde_json::from_value(json).unwrap();
        assert_eq!(back.code, RemoteErrorCode::LimitExceeded);
    }

    #[test]
    fn test_unrecognized_round_trip_is_stable() {
        let code = RemoteErrorCode::from_code(-4);
        let json = serde_json::to_value(code).unwrap();
        assert_eq!(json, serde_json::json!(-4));

        let back: RemoteErrorCode = serde_json::from_value(json).unwrap();
        assert_eq!(back, code);
        assert_eq!(RemoteErrorCode::from_code(27), RemoteErrorCode::LimitExceeded);
    }
}
