//! Retry configuration error types

use thiserror::Error;

/// Invalid backoff configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetryConfigError {
    /// Multiplier must be finite and at least 1
    #[error("Invalid backoff multiplier: {0}")]
    InvalidMultiplier(f64),

    /// Jitter ratio must lie in [0, 1)
    #[error("Invalid jitter ratio: {0}")]
    InvalidJitter(f64),

    /// Base delay exceeds the cap
    #[error("Base delay {base_ms}ms exceeds max delay {max_ms}ms")]
    DelayOrder { base_ms: u64, max_ms: u64 },
}
