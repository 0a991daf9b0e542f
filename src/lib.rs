//! Resilient web automation primitives
//!
//! Ties the locator fallback chain and the retry orchestrator together
//! behind a page facade, with layered configuration and logging setup.

pub mod config;
pub mod errors;
pub mod page;
pub mod runtime;

pub use action_locator::{
    DefaultElementResolver, DescriptorKind, DiagnosticContext, DocumentQuery, ElementDescriptor,
    ElementResolver, LocatorError, ResolveOptions,
};
pub use action_retry::{
    with_retry, BackoffConfig, ClassifyFailure, FailureKind, RetryPolicy, RetryState,
};
pub use config::{load_config, load_config_with_options, LoadOptions, ResilienceConfig};
pub use errors::{ConfigError, ResilienceError};
pub use page::ResilientPage;
