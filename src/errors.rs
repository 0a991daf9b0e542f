//! Error handling module
//!
//! Unifies locator, configuration and host automation failures so retry
//! presets can classify them.

use action_locator::LocatorError;
use action_retry::{
    classify_message, message_kinds, ClassifyFailure, FailureKind, RetryConfigError,
};
use thiserror::Error;

/// Configuration loading or validation failure
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unsupported config path: {0}")]
    UnsupportedPath(String),

    #[error("invalid backoff for retry.{section}: {source}")]
    Backoff {
        section: &'static str,
        #[source]
        source: RetryConfigError,
    },
}

/// Top-level error for resilient page operations
#[derive(Debug, Error, Clone)]
pub enum ResilienceError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure reported by the automation host (navigation, load state, ...)
    #[error("{0}")]
    Host(String),
}

impl ResilienceError {
    pub fn host(message: impl Into<String>) -> Self {
        ResilienceError::Host(message.into())
    }
}

impl ClassifyFailure for ResilienceError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            ResilienceError::Locator(err) if err.is_retryable() => FailureKind::Element,
            ResilienceError::Locator(_) | ResilienceError::Config(_) => FailureKind::Fatal,
            ResilienceError::Host(message) => classify_message(message),
        }
    }

    fn failure_kinds(&self) -> Vec<FailureKind> {
        match self {
            ResilienceError::Host(message) => message_kinds(message),
            other => vec![other.failure_kind()],
        }
    }
}
