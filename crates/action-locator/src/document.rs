//! Document capability consumed by the resolver

use crate::{errors::LocatorError, strategies::ElementQuery};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;

/// Live document query capability provided by the host automation framework
#[async_trait]
pub trait DocumentQuery: Send + Sync {
    /// Handle to a matched element
    type Handle: Clone + Send + Sync;

    /// First element currently matching `query`, in document order
    async fn find_first(&self, query: &ElementQuery) -> Result<Option<Self::Handle>, LocatorError>;

    /// Snapshot of the current document (e.g. a PNG screenshot)
    async fn capture_snapshot(&self) -> Result<Vec<u8>, LocatorError>;
}

/// Element handle returned by [`InMemoryDocument`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

#[derive(Debug, Clone)]
struct MemoryElement {
    id: String,
    queries: Vec<ElementQuery>,
    visible_from: Instant,
}

/// In-memory document used for dry runs and tests
///
/// Elements are kept in insertion order, which stands in for document order.
/// An element can be scheduled to become visible after a delay.
#[derive(Debug, Default)]
pub struct InMemoryDocument {
    elements: RwLock<Vec<MemoryElement>>,
    snapshot: Option<Vec<u8>>,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot bytes returned by `capture_snapshot`; without them capture fails
    pub fn with_snapshot(mut self, bytes: Vec<u8>) -> Self {
        self.snapshot = Some(bytes);
        self
    }

    /// Add a visible element matching the given queries
    pub fn insert(&self, id: impl Into<String>, queries: Vec<ElementQuery>) {
        self.insert_after(id, queries, Duration::ZERO);
    }

    /// Add an element that becomes visible after `delay`
    pub fn insert_after(&self, id: impl Into<String>, queries: Vec<ElementQuery>, delay: Duration) {
        self.elements.write().push(MemoryElement {
            id: id.into(),
            queries,
            visible_from: Instant::now() + delay,
        });
    }

    /// Detach an element
    pub fn remove(&self, id: &str) -> bool {
        let mut elements = self.elements.write();
        let before = elements.len();
        elements.retain(|element| element.id != id);
        elements.len() != before
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}

#[async_trait]
impl DocumentQuery for InMemoryDocument {
    type Handle = ElementRef;

    async fn find_first(&self, query: &ElementQuery) -> Result<Option<ElementRef>, LocatorError> {
        let now = Instant::now();
        let found = self
            .elements
            .read()
            .iter()
            .find(|element| element.visible_from <= now && element.queries.contains(query))
            .map(|element| ElementRef(element.id.clone()));
        Ok(found)
    }

    async fn capture_snapshot(&self) -> Result<Vec<u8>, LocatorError> {
        self.snapshot
            .clone()
            .ok_or_else(|| LocatorError::Artifact("document has no snapshot".to_string()))
    }
}
