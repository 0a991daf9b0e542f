//! Retry Orchestration Layer
//!
//! Wraps asynchronous operations (navigations, clicks, locator resolution)
//! with bounded retries, exponential backoff with jitter, and a predicate
//! deciding which failures are worth another attempt.

pub mod classify;
pub mod errors;
pub mod executor;
pub mod strategies;
pub mod types;

pub use classify::{classify_message, message_kinds, ClassifyFailure, FailureKind};
pub use errors::RetryConfigError;
pub use executor::{next_state, with_retry, RetryState};
pub use types::{BackoffConfig, RetryPolicy, RetryPredicate};
