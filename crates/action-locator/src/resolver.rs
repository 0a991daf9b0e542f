//! Element resolver with fallback chain orchestration

use crate::{
    artifacts::{failure_artifact_name, ArtifactSink},
    document::DocumentQuery,
    errors::LocatorError,
    strategies::*,
    types::*,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Upper bound on the failure snapshot capture
pub const DEFAULT_SNAPSHOT_TIMEOUT_MS: u64 = 5_000;

/// Smallest wait between two polls of the same descriptor
const MIN_POLL_WAIT: Duration = Duration::from_millis(1);

/// Element resolver trait
#[async_trait]
pub trait ElementResolver<D: DocumentQuery>: Send + Sync {
    /// Resolve the first descriptor that matches, in list order
    async fn resolve(
        &self,
        document: &D,
        descriptors: &[ElementDescriptor],
        options: &ResolveOptions,
    ) -> Result<D::Handle, LocatorError>;
}

/// Default element resolver implementation
///
/// Single pass over the descriptor list. Each descriptor is polled until its
/// own budget runs out before the next one is considered.
#[derive(Clone)]
pub struct DefaultElementResolver {
    poll: PollBackoff,
    snapshot_timeout: Duration,
    artifacts: Option<Arc<dyn ArtifactSink>>,
}

impl Default for DefaultElementResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultElementResolver {
    /// Create a resolver with default polling and no artifact sink
    pub fn new() -> Self {
        Self {
            poll: PollBackoff::default(),
            snapshot_timeout: Duration::from_millis(DEFAULT_SNAPSHOT_TIMEOUT_MS),
            artifacts: None,
        }
    }

    /// Set polling cadence
    pub fn with_poll_backoff(mut self, poll: PollBackoff) -> Self {
        self.poll = poll;
        self
    }

    /// Set failure snapshot timeout
    pub fn with_snapshot_timeout(mut self, snapshot_timeout: Duration) -> Self {
        self.snapshot_timeout = snapshot_timeout;
        self
    }

    /// Capture a snapshot into `sink` when every descriptor fails
    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifacts = Some(sink);
        self
    }

    pub fn poll_backoff(&self) -> PollBackoff {
        self.poll
    }

    /// Poll one descriptor until it matches or its budget elapses
    async fn poll_descriptor<D: DocumentQuery>(
        &self,
        document: &D,
        descriptor: &ElementDescriptor,
        query: &ElementQuery,
        budget: Duration,
    ) -> Option<D::Handle> {
        let mut attempt = ResolutionAttempt::start(descriptor);
        let deadline = attempt.started + budget;
        debug!("Trying descriptor: {} ({})", descriptor, query);

        loop {
            attempt.tries += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            match timeout(remaining, document.find_first(query)).await {
                Ok(Ok(Some(handle))) => {
                    info!(
                        "Resolved element using {}: {} (attempt {}, {}ms)",
                        attempt.descriptor.kind.name(),
                        attempt.descriptor.value,
                        attempt.tries,
                        attempt.elapsed().as_millis()
                    );
                    return Some(handle);
                }
                Ok(Ok(None)) => {
                    debug!("No match for {} (attempt {})", descriptor, attempt.tries);
                }
                Ok(Err(err)) => {
                    debug!(
                        "Query for {} failed (attempt {}): {}",
                        descriptor, attempt.tries, err
                    );
                }
                Err(_) => {
                    debug!(
                        "Query for {} outlived its budget (attempt {})",
                        descriptor, attempt.tries
                    );
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = self
                .poll
                .delay_after(attempt.tries)
                .max(MIN_POLL_WAIT)
                .min(deadline - now);
            sleep(wait).await;
        }

        warn!(
            "Descriptor {} exhausted after {} attempts ({}ms), trying next",
            descriptor,
            attempt.tries,
            attempt.elapsed().as_millis()
        );
        None
    }

    /// Best-effort failure snapshot; never fails the caller
    async fn capture_failure<D: DocumentQuery>(
        &self,
        document: &D,
        context: Option<&DiagnosticContext>,
    ) -> Option<String> {
        let sink = self.artifacts.as_ref()?;
        let name = failure_artifact_name(context);

        let bytes = match timeout(self.snapshot_timeout, document.capture_snapshot()).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => {
                warn!("Failure snapshot unavailable: {}", err);
                return None;
            }
            Err(_) => {
                warn!(
                    "Failure snapshot timed out after {}ms",
                    self.snapshot_timeout.as_millis()
                );
                return None;
            }
        };

        match sink.store(&name, bytes).await {
            Ok(location) => Some(location),
            Err(err) => {
                warn!("Failed to store failure snapshot {}: {}", name, err);
                None
            }
        }
    }
}

#[async_trait]
impl<D: DocumentQuery> ElementResolver<D> for DefaultElementResolver {
    async fn resolve(
        &self,
        document: &D,
        descriptors: &[ElementDescriptor],
        options: &ResolveOptions,
    ) -> Result<D::Handle, LocatorError> {
        if descriptors.is_empty() {
            return Err(LocatorError::NoDescriptors);
        }
        let queries = descriptors
            .iter()
            .map(ElementQuery::from_descriptor)
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Resolving element across {} descriptors ({}ms each)",
            descriptors.len(),
            options.timeout.as_millis()
        );
        let started = Instant::now();

        for (descriptor, query) in descriptors.iter().zip(&queries) {
            if let Some(handle) = self
                .poll_descriptor(document, descriptor, query, options.timeout)
                .await
            {
                return Ok(handle);
            }
        }

        let artifact = self
            .capture_failure(document, options.diagnostic.as_ref())
            .await;
        let err = LocatorError::ElementNotFound {
            attempted: descriptors.to_vec(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            artifact,
        };
        warn!("{}", err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::FsArtifactSink;
    use crate::document::{ElementRef, InMemoryDocument};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn options(timeout_ms: u64) -> ResolveOptions {
        ResolveOptions::default().with_timeout(ms(timeout_ms))
    }

    /// Counts queries and fails the first `failures` of them
    struct FlakyDocument {
        inner: InMemoryDocument,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl DocumentQuery for FlakyDocument {
        type Handle = ElementRef;

        async fn find_first(
            &self,
            query: &ElementQuery,
        ) -> Result<Option<ElementRef>, LocatorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(LocatorError::Query("execution context destroyed".into()));
            }
            self.inner.find_first(query).await
        }

        async fn capture_snapshot(&self) -> Result<Vec<u8>, LocatorError> {
            self.inner.capture_snapshot().await
        }
    }

    /// Queries never complete
    struct HangingDocument;

    #[async_trait]
    impl DocumentQuery for HangingDocument {
        type Handle = ElementRef;

        async fn find_first(&self, _: &ElementQuery) -> Result<Option<ElementRef>, LocatorError> {
            std::future::pending().await
        }

        async fn capture_snapshot(&self) -> Result<Vec<u8>, LocatorError> {
            std::future::pending().await
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ArtifactSink for FailingSink {
        async fn store(&self, _: &str, _: Vec<u8>) -> Result<String, LocatorError> {
            Err(LocatorError::Artifact("disk full".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_descriptor_match_returns_immediately() {
        let document = InMemoryDocument::new();
        document.insert("search", vec![ElementQuery::Selector("#gh-ac".into())]);
        let resolver = DefaultElementResolver::new();

        let start = Instant::now();
        let handle = resolver
            .resolve(&document, &[ElementDescriptor::css("#gh-ac")], &options(8_000))
            .await
            .unwrap();

        assert_eq!(handle, ElementRef("search".into()));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn kth_descriptor_wins_after_earlier_budgets_elapse() {
        let document = InMemoryDocument::new();
        document.insert("third", vec![ElementQuery::Text("Checkout".into())]);
        let descriptors = vec![
            ElementDescriptor::css("#checkout"),
            ElementDescriptor::xpath("//button[@data-test='checkout']"),
            ElementDescriptor::text("Checkout"),
        ];
        let resolver = DefaultElementResolver::new();

        let start = Instant::now();
        let handle = resolver
            .resolve(&document, &descriptors, &options(1_000))
            .await
            .unwrap();

        assert_eq!(handle, ElementRef("third".into()));
        let elapsed = start.elapsed();
        assert!(elapsed >= ms(2_000), "elapsed {:?}", elapsed);
        assert!(elapsed < ms(2_100), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn text_fallback_to_structural_scenario() {
        let document = InMemoryDocument::new();
        document.insert_after(
            "atc",
            vec![ElementQuery::Selector("#atc-btn".into())],
            ms(500),
        );
        let descriptors = vec![
            ElementDescriptor::text("Add to cart"),
            ElementDescriptor::css("#atc-btn"),
        ];
        let resolver = DefaultElementResolver::new();

        let start = Instant::now();
        let handle = resolver
            .resolve(&document, &descriptors, &ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(handle, ElementRef("atc".into()));
        let elapsed = start.elapsed();
        assert!(elapsed >= ms(8_000), "elapsed {:?}", elapsed);
        assert!(elapsed < ms(8_100), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_list_reports_every_descriptor() {
        let document = InMemoryDocument::new();
        let descriptors = vec![
            ElementDescriptor::css(".s-item__price"),
            ElementDescriptor::xpath("//span[@class='price']"),
            ElementDescriptor::text("US $"),
        ];
        let resolver = DefaultElementResolver::new();

        let start = Instant::now();
        let err = resolver
            .resolve(&document, &descriptors, &options(1_500))
            .await
            .unwrap_err();

        assert!(start.elapsed() >= ms(4_500));
        match err {
            LocatorError::ElementNotFound {
                attempted,
                elapsed_ms,
                artifact,
            } => {
                assert_eq!(attempted, descriptors);
                assert!(elapsed_ms >= 4_500);
                assert!(artifact.is_none());
            }
            other => panic!("expected ElementNotFound, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_with_linear_spacing_until_deadline() {
        let document = FlakyDocument {
            inner: InMemoryDocument::new(),
            failures: 0,
            calls: AtomicU32::new(0),
        };
        let resolver = DefaultElementResolver::new();

        let _ = resolver
            .resolve(&document, &[ElementDescriptor::css("#missing")], &options(2_000))
            .await;

        // polls at 0, 300, 900, 1800 and a final one at the 2000ms deadline
        assert_eq!(document.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_query_errors_are_swallowed() {
        let inner = InMemoryDocument::new();
        inner.insert("cart", vec![ElementQuery::Selector("#gh-cart".into())]);
        let document = FlakyDocument {
            inner,
            failures: 3,
            calls: AtomicU32::new(0),
        };
        let resolver = DefaultElementResolver::new();

        let start = Instant::now();
        let handle = resolver
            .resolve(&document, &[ElementDescriptor::css("#gh-cart")], &options(8_000))
            .await
            .unwrap();

        assert_eq!(handle, ElementRef("cart".into()));
        assert_eq!(document.calls.load(Ordering::SeqCst), 4);
        // 300 + 600 + 900 between the four polls
        assert_eq!(start.elapsed(), ms(1_800));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_query_is_bounded_by_budget() {
        let resolver = DefaultElementResolver::new()
            .with_artifact_sink(Arc::new(FailingSink))
            .with_snapshot_timeout(ms(100));

        let start = Instant::now();
        let err = resolver
            .resolve(
                &HangingDocument,
                &[ElementDescriptor::css("#a"), ElementDescriptor::css("#b")],
                &options(1_000),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(start.elapsed(), ms(2_100));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_resolution_returns_same_element() {
        let document = InMemoryDocument::new();
        let query = ElementQuery::Selector(".s-item".into());
        document.insert("item-1", vec![query.clone()]);
        document.insert("item-2", vec![query]);
        let resolver = DefaultElementResolver::new();
        let descriptors = [ElementDescriptor::css(".s-item")];

        let first = resolver
            .resolve(&document, &descriptors, &options(1_000))
            .await
            .unwrap();
        let second = resolver
            .resolve(&document, &descriptors, &options(1_000))
            .await
            .unwrap();

        assert_eq!(first, ElementRef("item-1".into()));
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_bad_input_without_waiting() {
        let document = InMemoryDocument::new();
        let resolver = DefaultElementResolver::new();
        let start = Instant::now();

        let empty = resolver.resolve(&document, &[], &options(1_000)).await;
        assert!(matches!(empty, Err(LocatorError::NoDescriptors)));

        let blank = resolver
            .resolve(
                &document,
                &[ElementDescriptor::css("#ok"), ElementDescriptor::text("  ")],
                &options(1_000),
            )
            .await;
        assert!(matches!(blank, Err(LocatorError::InvalidDescriptor(_))));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failure_does_not_mask_not_found() {
        let document = InMemoryDocument::new().with_snapshot(vec![1, 2, 3]);
        let resolver = DefaultElementResolver::new().with_artifact_sink(Arc::new(FailingSink));

        let err = resolver
            .resolve(&document, &[ElementDescriptor::css("#gone")], &options(500))
            .await
            .unwrap_err();

        match err {
            LocatorError::ElementNotFound { artifact, .. } => assert!(artifact.is_none()),
            other => panic!("expected ElementNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_snapshot_is_written_to_sink() {
        let dir = tempfile::tempdir().unwrap();
        let document = InMemoryDocument::new().with_snapshot(b"png-bytes".to_vec());
        let resolver = DefaultElementResolver::new()
            .with_artifact_sink(Arc::new(FsArtifactSink::new(dir.path())));
        let options = options(20).with_diagnostic(DiagnosticContext::new("Cart total", "chromium"));

        let err = resolver
            .resolve(&document, &[ElementDescriptor::css("#subtotal")], &options)
            .await
            .unwrap_err();

        let LocatorError::ElementNotFound { artifact, .. } = &err else {
            panic!("expected ElementNotFound, got {err:?}");
        };
        let location = artifact.clone().expect("snapshot location");
        assert!(location.contains("locator-failure-chromium-cart-total-"));
        assert_eq!(std::fs::read(&location).unwrap(), b"png-bytes".to_vec());
        assert!(err.to_string().contains(&location));
    }
}
