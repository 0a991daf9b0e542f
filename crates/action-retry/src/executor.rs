//! Retry executor built on an explicit attempt state machine

use crate::types::RetryPolicy;
use std::fmt;
use std::future::Future;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Retry state machine
///
/// `Attempting(k)` runs attempt `k` (0-based). The other three states are
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState<T, E> {
    /// About to run attempt `k`, after its backoff delay when `k > 0`
    Attempting(u32),

    /// Operation returned a value
    Succeeded { value: T, attempts: u32 },

    /// Predicate rejected the failure
    FailedFatal { error: E, attempts: u32 },

    /// Retry budget spent on retryable failures
    FailedExhausted { error: E, attempts: u32 },
}

impl<T, E> RetryState<T, E> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Attempting(_))
    }
}

/// Transition taken when attempt `attempt` fails
pub fn next_state<T, E>(
    attempt: u32,
    max_retries: u32,
    retryable: bool,
    error: E,
) -> RetryState<T, E> {
    let attempts = attempt + 1;
    if !retryable {
        RetryState::FailedFatal { error, attempts }
    } else if attempt >= max_retries {
        RetryState::FailedExhausted { error, attempts }
    } else {
        RetryState::Attempting(attempts)
    }
}

/// Run `operation` under `policy`
///
/// Attempts are strictly sequential and the operation is invoked at most
/// `max_retries + 1` times. The operation must be safe to re-invoke. The
/// error returned is the one produced by the last attempt, unchanged.
pub async fn with_retry<T, E, F, Fut>(mut operation: F, policy: &RetryPolicy<E>) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let backoff = policy.backoff;
    let mut state = RetryState::Attempting(0);

    loop {
        state = match state {
            RetryState::Attempting(attempt) => {
                if attempt > 0 {
                    let delay = backoff.jittered_delay_for(attempt, &mut rand::thread_rng());
                    info!(
                        "Retry attempt {}/{} after {}ms delay",
                        attempt,
                        backoff.max_retries,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                }

                match operation().await {
                    Ok(value) => RetryState::Succeeded {
                        value,
                        attempts: attempt + 1,
                    },
                    Err(error) => {
                        let retryable = policy.is_retryable(&error);
                        if retryable && attempt < backoff.max_retries {
                            warn!("Attempt {} failed: {}", attempt + 1, error);
                        }
                        next_state(attempt, backoff.max_retries, retryable, error)
                    }
                }
            }
            RetryState::Succeeded { value, attempts } => {
                if attempts > 1 {
                    info!(
                        "Operation succeeded on attempt {}/{}",
                        attempts,
                        backoff.max_attempts()
                    );
                }
                return Ok(value);
            }
            RetryState::FailedFatal { error, attempts } => {
                error!("Non-retryable error on attempt {}: {}", attempts, error);
                return Err(error);
            }
            RetryState::FailedExhausted { error, attempts } => {
                error!("All {} attempts failed. Final error: {}", attempts, error);
                return Err(error);
            }
        };
    }
}
