//! Retry policy types

use crate::classify::{ClassifyFailure, FailureKind};
use crate::errors::RetryConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default jitter applied to every backoff delay (±25%)
pub const DEFAULT_JITTER_RATIO: f64 = 0.25;

/// Decides whether a failure may be retried
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Numeric part of a retry policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay_ms: u64,

    /// Cap applied before jitter
    pub max_delay_ms: u64,

    /// Growth factor between consecutive retries
    pub backoff_multiplier: f64,

    /// Relative jitter, each delay is scaled by a factor in `[1 - r, 1 + r]`
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl BackoffConfig {
    /// Page load / navigation tuning: fewer, slower retries
    pub fn page() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 2_000,
            ..Self::default()
        }
    }

    /// Element / locator tuning: more, quicker retries
    pub fn locator() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            ..Self::default()
        }
    }

    /// Total operation invocations allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(RetryConfigError::InvalidMultiplier(self.backoff_multiplier));
        }
        if !(0.0..1.0).contains(&self.jitter_ratio) {
            return Err(RetryConfigError::InvalidJitter(self.jitter_ratio));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(RetryConfigError::DelayOrder {
                base_ms: self.base_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        Ok(())
    }
}

/// Retry policy: backoff numbers plus a retryability predicate
///
/// Built once per call site and shared read-only; cloning only bumps the
/// predicate's reference count.
pub struct RetryPolicy<E> {
    pub backoff: BackoffConfig,
    predicate: RetryPredicate<E>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            backoff: self.backoff,
            predicate: self.predicate.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<E> RetryPolicy<E> {
    /// Policy with an arbitrary predicate
    pub fn with_predicate<P>(backoff: BackoffConfig, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            backoff,
            predicate: Arc::new(predicate),
        }
    }

    /// Policy that retries every failure
    pub fn always(backoff: BackoffConfig) -> Self {
        Self::with_predicate(backoff, |_: &E| true)
    }

    pub fn is_retryable(&self, failure: &E) -> bool {
        (self.predicate)(failure)
    }

    /// Same numbers, different predicate
    pub fn retry_if<P>(self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::with_predicate(self.backoff, predicate)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.backoff.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.backoff.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.backoff.max_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.backoff.jitter_ratio = ratio;
        self
    }
}

impl<E: ClassifyFailure> RetryPolicy<E> {
    /// Retries timeout, navigation and network failures
    pub fn new(backoff: BackoffConfig) -> Self {
        Self::with_predicate(backoff, |failure: &E| {
            failure
                .failure_kinds()
                .iter()
                .any(FailureKind::is_transient)
        })
    }

    /// Navigation / load-state preset
    pub fn page() -> Self {
        Self::page_with(BackoffConfig::page())
    }

    /// Page preset predicate with custom numbers
    pub fn page_with(backoff: BackoffConfig) -> Self {
        Self::new(backoff)
    }

    /// Element / locator preset
    pub fn locator() -> Self {
        Self::locator_with(BackoffConfig::locator())
    }

    /// Locator preset predicate with custom numbers
    pub fn locator_with(backoff: BackoffConfig) -> Self {
        Self::with_predicate(backoff, |failure: &E| {
            failure.is_any_of(&[FailureKind::Timeout, FailureKind::Element])
        })
    }
}

impl<E: ClassifyFailure> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
