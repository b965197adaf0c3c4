use crate::config::ConfigurationError;
use crate::execution::QueueError;
use crate::orchestration::RecoveryError;

/// Crate-level error for callers that do not care which layer failed
#[derive(Debug, thiserror::Error)]
pub enum ResilienceError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Resilience runtime must be created inside a tokio runtime")]
    RuntimeUnavailable,
}

pub type Result<T> = std::result::Result<T, ResilienceError>;
