//! Notification names.
//!
//! Delivery is cumulative: a classified error is posted under the generic
//! [`NotificationName::CLOUD_ERROR`], then under
//! [`NotificationName::BATCH_ISSUE`] for the three batch categories, then
//! under the category's own name. Consumers watching only a broad name still
//! see every failure.

use crate::orchestration::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Name consumers subscribe to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationName(Cow<'static, str>);

impl NotificationName {
    /// Any classified remote error
    pub const CLOUD_ERROR: Self = Self::from_static("CLOUD_ERROR_OCCURED");
    pub const NOT_AUTHENTICATED: Self = Self::from_static("CLOUD_ERROR_NOT_AUTHENTICATED");
    pub const SERVER_RECORD_CHANGED: Self = Self::from_static("CLOUD_ERROR_CHANGED_RECORD");
    /// Limit exceeded, batch request failed, or partial failure
    pub const BATCH_ISSUE: Self = Self::from_static("CLOUD_ERROR_BATCH_ISSUE");
    pub const LIMIT_EXCEEDED: Self = Self::from_static("CLOUD_ERROR_LIMIT_EXCEEDED");
    pub const BATCH_REQUEST_FAILED: Self = Self::from_static("CLOUD_ERROR_BATCH_REQUEST");
    pub const PARTIAL_FAILURE: Self = Self::from_static("CLOUD_ERROR_PARTIAL_FAILURE");
    pub const RETRIABLE: Self = Self::from_static("CLOUD_ERROR_RETRIABLE");
    pub const FATAL: Self = Self::from_static("CLOUD_ERROR_FATAL");
    pub const SHARING: Self = Self::from_static("CLOUD_ERROR_SHARING");
    /// A recoverable failure that recovery could not handle
    pub const UNRECOVERED: Self = Self::from_static("CLOUD_ERROR_UNRECOVERED");

    /// Every name in the catalog
    pub const CATALOG: [NotificationName; 11] = [
        Self::CLOUD_ERROR,
        Self::NOT_AUTHENTICATED,
        Self::SERVER_RECORD_CHANGED,
        Self::BATCH_ISSUE,
        Self::LIMIT_EXCEEDED,
        Self::BATCH_REQUEST_FAILED,
        Self::PARTIAL_FAILURE,
        Self::RETRIABLE,
        Self::FATAL,
        Self::SHARING,
        Self::UNRECOVERED,
    ];

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name belongs to the fixed catalog
    pub fn is_catalogued(&self) -> bool {
        Self::CATALOG.iter().any(|name| name == self)
    }
}

impl fmt::Display for NotificationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Names a classification of `category` is posted under, broadest first
pub fn names_for(category: ErrorCategory) -> Vec<NotificationName> {
    let mut names = vec![NotificationName::CLOUD_ERROR];
    match category {
        ErrorCategory::Unauthenticated => names.push(NotificationName::NOT_AUTHENTICATED),
        ErrorCategory::RecordConflict => names.push(NotificationName::SERVER_RECORD_CHANGED),
        ErrorCategory::LimitExceeded => {
            names.push(NotificationName::BATCH_ISSUE);
            names.push(NotificationName::LIMIT_EXCEEDED);
        }
        ErrorCategory::BatchFailure => {
            names.push(NotificationName::BATCH_ISSUE);
            names.push(NotificationName::BATCH_REQUEST_FAILED);
        }
        ErrorCategory::PartialFailure => {
            names.push(NotificationName::BATCH_ISSUE);
            names.push(NotificationName::PARTIAL_FAILURE);
        }
        ErrorCategory::Retriable => names.push(NotificationName::RETRIABLE),
        ErrorCategory::Fatal => names.push(NotificationName::FATAL),
        ErrorCategory::SharingError => names.push(NotificationName::SHARING),
    }
    names
}
