//! # Structured Logging Module
//!
//! Environment-aware structured logging for the resilience layer, plus a
//! uniform lifecycle record for operations.

use crate::constants::env;
use crate::models::RemoteError;
use crate::operation::{OperationRef, OperationState};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once; an already-installed global subscriber is
/// left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = if use_json_format() {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(
            environment = %environment,
            pid = std::process::id(),
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var(env::ENVIRONMENT)
        .or_else(|_| std::env::var(env::APP_ENVIRONMENT))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var(env::LOG_FORMAT)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log an operation lifecycle transition
pub fn log_operation_event(
    operation: &OperationRef,
    state: OperationState,
    error: Option<&RemoteError>,
) {
    match error {
        Some(error) => tracing::warn!(
            operation_id = %operation.id,
            operation_name = %operation.name,
            kind = %operation.kind,
            state = %state,
            error_code = %error.code,
            error = %error.message,
            "OPERATION_EVENT"
        ),
        None => tracing::debug!(
            operation_id = %operation.id,
            operation_name = %operation.name,
            kind = %operation.kind,
            state = %state,
            "OPERATION_EVENT"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteErrorCode;
    use crate::operation::OperationKind;
    use uuid::Uuid;

    #[test]
    fn test_environment_detection() {
        std::env::set_var(env::ENVIRONMENT, "test_override");
        let environment = get_environment();
        assert_eq!(environment, "test_override");
        std::env::remove_var(env::ENVIRONMENT);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();

        let operation = OperationRef {
            id: Uuid::new_v4(),
            name: "upload".to_string(),
            kind: OperationKind::Upload,
        };
        log_operation_event(&operation, OperationState::Executing, None);
        log_operation_event(
            &operation,
            OperationState::Failed,
            Some(&RemoteError::new(RemoteErrorCode::LimitExceeded, "too big")),
        );
    }
}
