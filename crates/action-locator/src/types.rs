//! Core types for locator system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Default per-descriptor budget in milliseconds
pub const DEFAULT_DESCRIPTOR_TIMEOUT_MS: u64 = 8_000;

/// Descriptor kind enumeration
///
/// Serialized with the short names used by locator registries
/// (`css`, `xpath`, `text`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorKind {
    /// Structural (CSS-like) selector
    #[serde(rename = "css")]
    Structural,

    /// Hierarchical (XPath-like) selector
    #[serde(rename = "xpath")]
    Pathed,

    /// Visible text match
    #[serde(rename = "text")]
    Textual,
}

impl DescriptorKind {
    /// Get kind name as string
    pub fn name(&self) -> &'static str {
        match self {
            DescriptorKind::Structural => "css",
            DescriptorKind::Pathed => "xpath",
            DescriptorKind::Textual => "text",
        }
    }
}

/// One candidate way to find an element
///
/// Callers keep an ordered list of these; list order is fallback priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Query kind
    #[serde(rename = "type")]
    pub kind: DescriptorKind,

    /// Selector or text payload
    pub value: String,
}

impl ElementDescriptor {
    pub fn new(kind: DescriptorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Structural (CSS) descriptor
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(DescriptorKind::Structural, selector)
    }

    /// Pathed (XPath) descriptor
    pub fn xpath(path: impl Into<String>) -> Self {
        Self::new(DescriptorKind::Pathed, path)
    }

    /// Textual descriptor
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(DescriptorKind::Textual, content)
    }
}

impl fmt::Display for ElementDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.value)
    }
}

/// Test-level context used to name failure snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    /// Test title, e.g. "adds item to cart"
    pub test_title: String,

    /// Runner project / browser name, e.g. "chromium"
    pub project: String,
}

impl DiagnosticContext {
    pub fn new(test_title: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            test_title: test_title.into(),
            project: project.into(),
        }
    }

    /// File-name friendly identifier: `<project>-<title-slug>`
    pub fn slug(&self) -> String {
        let title = self
            .test_title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect::<String>();
        format!("{}-{}", self.project, title)
    }
}

/// Options for a single resolution call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Budget granted to each descriptor
    pub timeout: Duration,

    /// Naming context for the failure snapshot (cosmetic only)
    pub diagnostic: Option<DiagnosticContext>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_DESCRIPTOR_TIMEOUT_MS),
            diagnostic: None,
        }
    }
}

impl ResolveOptions {
    /// Set per-descriptor timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach diagnostic context
    pub fn with_diagnostic(mut self, diagnostic: DiagnosticContext) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }
}

/// Bookkeeping for one descriptor while it is being polled
#[derive(Debug)]
pub(crate) struct ResolutionAttempt<'a> {
    pub descriptor: &'a ElementDescriptor,
    pub tries: u32,
    pub started: Instant,
}

impl<'a> ResolutionAttempt<'a> {
    pub fn start(descriptor: &'a ElementDescriptor) -> Self {
        Self {
            descriptor,
            tries: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
