//! Descriptor translation and polling cadence
//!
//! Each descriptor kind maps onto one query engine:
//! 1. Structural - direct selector query
//! 2. Pathed - hierarchical (XPath) query
//! 3. Textual - visible text query

use crate::{errors::LocatorError, types::*};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default spacing unit between polls of one descriptor
pub const DEFAULT_POLL_STEP_MS: u64 = 300;

/// Concrete query issued against the document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementQuery {
    /// Direct selector query
    Selector(String),

    /// Hierarchical path query
    Path(String),

    /// Visible text query
    Text(String),
}

impl ElementQuery {
    /// Translate a descriptor into its query
    pub fn from_descriptor(descriptor: &ElementDescriptor) -> Result<Self, LocatorError> {
        let value = descriptor.value.trim();
        if value.is_empty() {
            return Err(LocatorError::InvalidDescriptor(format!(
                "Empty {} payload",
                descriptor.kind.name()
            )));
        }

        Ok(match descriptor.kind {
            DescriptorKind::Structural => ElementQuery::Selector(value.to_string()),
            DescriptorKind::Pathed => ElementQuery::Path(value.to_string()),
            DescriptorKind::Textual => ElementQuery::Text(value.to_string()),
        })
    }

    /// Engine-prefixed selector string (`xpath=...`, `text=...`)
    pub fn selector(&self) -> String {
        match self {
            ElementQuery::Selector(selector) => selector.clone(),
            ElementQuery::Path(path) => format!("xpath={}", path),
            ElementQuery::Text(text) => format!("text={}", text),
        }
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector())
    }
}

/// Linear spacing between polls: the n-th wait lasts `n * step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollBackoff {
    pub step_ms: u64,
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self {
            step_ms: DEFAULT_POLL_STEP_MS,
        }
    }
}

impl PollBackoff {
    pub fn new(step: Duration) -> Self {
        Self {
            step_ms: u64::try_from(step.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Wait after the given 1-based poll, before the next one
    pub fn delay_after(&self, poll: u32) -> Duration {
        Duration::from_millis(self.step_ms.saturating_mul(u64::from(poll)))
    }
}
