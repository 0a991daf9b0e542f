//! Page facade combining element resolution with retry presets

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use action_locator::{
    DiagnosticContext, DocumentQuery, ElementDescriptor, ElementResolver, ResolveOptions,
};
use action_retry::{with_retry, RetryPolicy};
use tracing::debug;

use crate::config::ResilienceConfig;
use crate::errors::ResilienceError;

/// A document plus the resolver and retry presets used against it
pub struct ResilientPage<D: DocumentQuery> {
    document: D,
    resolver: Arc<dyn ElementResolver<D>>,
    options: ResolveOptions,
    default_policy: RetryPolicy<ResilienceError>,
    page_policy: RetryPolicy<ResilienceError>,
    locator_policy: RetryPolicy<ResilienceError>,
}

impl<D: DocumentQuery> ResilientPage<D> {
    /// Page with built-in defaults
    pub fn new(document: D) -> Self {
        Self::from_config(document, &ResilienceConfig::default())
    }

    pub fn from_config(document: D, config: &ResilienceConfig) -> Self {
        Self {
            document,
            resolver: Arc::new(config.locator.build_resolver()),
            options: config.locator.resolve_options(),
            default_policy: RetryPolicy::new(config.retry.default),
            page_policy: RetryPolicy::page_with(config.retry.page),
            locator_policy: RetryPolicy::locator_with(config.retry.locator),
        }
    }

    /// Swap the element resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn ElementResolver<D>>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Attach test identity to failure snapshots
    pub fn with_diagnostic(mut self, diagnostic: DiagnosticContext) -> Self {
        self.options = self.options.with_diagnostic(diagnostic);
        self
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// Options used when the caller passes none
    pub fn default_options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn default_policy(&self) -> &RetryPolicy<ResilienceError> {
        &self.default_policy
    }

    /// Single resolver pass over `descriptors`
    pub async fn resolve_once(
        &self,
        descriptors: &[ElementDescriptor],
        options: Option<&ResolveOptions>,
    ) -> Result<D::Handle, ResilienceError> {
        let options = options.unwrap_or(&self.options);
        Ok(self
            .resolver
            .resolve(&self.document, descriptors, options)
            .await?)
    }

    /// Resolution wrapped in the locator retry preset
    pub async fn locate(
        &self,
        descriptors: &[ElementDescriptor],
        options: Option<&ResolveOptions>,
    ) -> Result<D::Handle, ResilienceError> {
        debug!("Locating element with {} descriptors", descriptors.len());
        with_retry(
            || self.resolve_once(descriptors, options),
            &self.locator_policy,
        )
        .await
    }

    /// Navigation or load-state operation wrapped in the page retry preset
    pub async fn navigate<T, F, Fut>(&self, operation: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        with_retry(operation, &self.page_policy).await
    }

    /// Any operation under a caller-supplied policy
    pub async fn retry<T, E, F, Fut>(&self, operation: F, policy: &RetryPolicy<E>) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        with_retry(operation, policy).await
    }
}
