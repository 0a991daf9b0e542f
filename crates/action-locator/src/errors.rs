//! Error types for locator system

use crate::types::ElementDescriptor;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Every descriptor exhausted its budget without a match
    #[error(
        "Element not found: tried [{}] over {elapsed_ms}ms; snapshot: {}",
        describe_attempted(.attempted),
        describe_artifact(.artifact)
    )]
    ElementNotFound {
        /// Descriptors tried, in priority order
        attempted: Vec<ElementDescriptor>,
        /// Wall-clock time spent across all descriptors
        elapsed_ms: u64,
        /// Location of the failure snapshot, if capture succeeded
        artifact: Option<String>,
    },

    /// Resolution was requested without any descriptor
    #[error("No descriptors supplied")]
    NoDescriptors,

    /// Descriptor cannot be translated into a query
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A single document query failed (transient, swallowed while polling)
    #[error("Query failed: {0}")]
    Query(String),

    /// Diagnostic capture failed
    #[error("Artifact capture failed: {0}")]
    Artifact(String),
}

impl LocatorError {
    /// Check if error is worth retrying at a higher level
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LocatorError::ElementNotFound { .. } | LocatorError::Query(_)
        )
    }

    /// Check if this is the "no candidate matched" failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, LocatorError::ElementNotFound { .. })
    }

    /// Descriptors attempted before giving up (empty for other variants)
    pub fn attempted(&self) -> &[ElementDescriptor] {
        match self {
            LocatorError::ElementNotFound { attempted, .. } => attempted,
            _ => &[],
        }
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::NoDescriptors | LocatorError::InvalidDescriptor(_) => 2,
            LocatorError::ElementNotFound { .. } => 1,
            LocatorError::Query(_) | LocatorError::Artifact(_) => 0,
        }
    }
}

fn describe_attempted(attempted: &[ElementDescriptor]) -> String {
    attempted
        .iter()
        .map(|descriptor| descriptor.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_artifact(artifact: &Option<String>) -> &str {
    artifact.as_deref().unwrap_or("<none>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_lists_every_descriptor() {
        let err = LocatorError::ElementNotFound {
            attempted: vec![
                ElementDescriptor::text("Add to cart"),
                ElementDescriptor::css("#atc-btn"),
            ],
            elapsed_ms: 16_000,
            artifact: Some("test-results/locator-failure-x.png".to_string()),
        };

        let message = err.to_string();
        assert!(message.contains("text:Add to cart"));
        assert!(message.contains("css:#atc-btn"));
        assert!(message.contains("16000ms"));
        assert!(message.contains("test-results/locator-failure-x.png"));
        assert!(err.is_not_found());
        assert_eq!(err.attempted().len(), 2);
    }

    #[test]
    fn not_found_without_artifact() {
        let err = LocatorError::ElementNotFound {
            attempted: vec![ElementDescriptor::xpath("//button")],
            elapsed_ms: 10,
            artifact: None,
        };
        assert!(err.to_string().ends_with("snapshot: <none>"));
    }

    #[test]
    fn caller_errors_are_not_retryable() {
        assert!(!LocatorError::NoDescriptors.is_retryable());
        assert!(!LocatorError::InvalidDescriptor("blank".into()).is_retryable());
        assert!(LocatorError::Query("detached".into()).is_retryable());
        assert_eq!(LocatorError::NoDescriptors.severity(), 2);
    }
}
