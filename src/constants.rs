//! # System Constants
//!
//! Fixed values that define the operational boundaries of the resilience layer.

/// Result limit assigned to a download replica when the failed download had no limit.
pub const DEFAULT_DOWNLOAD_LIMIT: usize = 20;

/// Suffix appended to an operation name to mark it as a replica.
pub const REPLICA_NAME_SUFFIX: &str = "+";

/// Default number of operations the primary queue runs at once.
pub const DEFAULT_PRIMARY_CONCURRENCY: usize = 8;

/// Default capacity of the broadcaster's async notification channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1000;

/// Queue names used by the runtime
pub mod queues {
    pub const PRIMARY: &str = "primary";
    pub const RECOVERY: &str = "recovery";
    pub const MANUAL: &str = "manual";
}

/// Keys looked up in remote push payloads
pub mod remote_payload {
    pub const ALERT: &str = "alert";
    pub const LOCALIZATION_KEY: &str = "loc-key";
    pub const NOTIFICATION: &str = "notification";
}

/// Environment variables read at startup
pub mod env {
    pub const ENVIRONMENT: &str = "RESILIENCE_ENV";
    pub const APP_ENVIRONMENT: &str = "APP_ENV";
    pub const LOG_FORMAT: &str = "RESILIENCE_LOG_FORMAT";
    pub const CONFIG_PREFIX: &str = "RESILIENCE";
}
