//! Failure classification used by retry predicates

use serde::{Deserialize, Serialize};
use std::io;

/// Broad class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An operation or wait ran out of time
    Timeout,
    /// Page navigation or load-state failure
    Navigation,
    /// Transport level failure (connection reset, DNS, ...)
    Network,
    /// Element lookup or interaction failure
    Element,
    /// Anything that another attempt will not fix
    Fatal,
}

impl FailureKind {
    /// Timeout, navigation and network failures
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::Navigation | FailureKind::Network
        )
    }
}

/// Errors that can report their [`FailureKind`]
pub trait ClassifyFailure {
    /// Primary category
    fn failure_kind(&self) -> FailureKind;

    /// Every category the failure belongs to, primary first
    fn failure_kinds(&self) -> Vec<FailureKind> {
        vec![self.failure_kind()]
    }

    /// True when any category of the failure is in `kinds`
    fn is_any_of(&self, kinds: &[FailureKind]) -> bool {
        self.failure_kinds().iter().any(|kind| kinds.contains(kind))
    }
}

/// Every category whose markers appear in `message`
///
/// Mirrors what automation frameworks put in their error strings:
/// `Timeout 30000ms exceeded`, `net::ERR_CONNECTION_RESET`,
/// `Navigation failed`, `waitForLoadState`, `locator.click`, ...
/// A message like `locator.click: Navigation interrupted` is both an
/// element and a navigation failure. Returns `[Fatal]` when nothing matches.
pub fn message_kinds(message: &str) -> Vec<FailureKind> {
    let lower = message.to_ascii_lowercase();

    let mut kinds = Vec::new();
    if contains_any(&lower, &["timeout", "timed out"]) {
        kinds.push(FailureKind::Timeout);
    }
    if contains_any(&lower, &["net::"]) {
        kinds.push(FailureKind::Network);
    }
    if contains_any(&lower, &["navigation", "waitforloadstate"]) {
        kinds.push(FailureKind::Navigation);
    }
    if contains_any(&lower, &["locator", "element", "selector"]) {
        kinds.push(FailureKind::Element);
    }
    if kinds.is_empty() {
        kinds.push(FailureKind::Fatal);
    }
    kinds
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Primary category of a message, in the order timeout, network,
/// navigation, element
pub fn classify_message(message: &str) -> FailureKind {
    message_kinds(message)
        .first()
        .copied()
        .unwrap_or(FailureKind::Fatal)
}

impl ClassifyFailure for String {
    fn failure_kind(&self) -> FailureKind {
        classify_message(self)
    }

    fn failure_kinds(&self) -> Vec<FailureKind> {
        message_kinds(self)
    }
}

impl ClassifyFailure for io::Error {
    fn failure_kind(&self) -> FailureKind {
        match self.kind() {
            io::ErrorKind::TimedOut => FailureKind::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe => FailureKind::Network,
            _ => FailureKind::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_framework_messages() {
        assert_eq!(
            classify_message("Timeout 30000ms exceeded."),
            FailureKind::Timeout
        );
        assert_eq!(
            classify_message("page.goto: net::ERR_CONNECTION_RESET"),
            FailureKind::Network
        );
        assert_eq!(
            classify_message("Navigation failed because page crashed"),
            FailureKind::Navigation
        );
        assert_eq!(
            classify_message("page.waitForLoadState: Target closed"),
            FailureKind::Navigation
        );
        assert_eq!(
            classify_message("All locators failed: #atc-btn"),
            FailureKind::Element
        );
        assert_eq!(
            classify_message("expected 2 items in cart, found 1"),
            FailureKind::Fatal
        );
    }

    #[test]
    fn mixed_messages_report_every_category() {
        assert_eq!(
            message_kinds("locator.click: Navigation interrupted by another navigation"),
            vec![FailureKind::Navigation, FailureKind::Element]
        );
        assert_eq!(
            message_kinds("locator.waitFor: net::ERR_ABORTED while waiting for element"),
            vec![FailureKind::Network, FailureKind::Element]
        );
        assert_eq!(message_kinds("cart is empty"), vec![FailureKind::Fatal]);

        let message = "locator.click: Timeout 5000ms exceeded".to_string();
        assert_eq!(message.failure_kind(), FailureKind::Timeout);
        assert!(message.is_any_of(&[FailureKind::Element]));
        assert!(!message.is_any_of(&[FailureKind::Network]));
    }

    #[test]
    fn transient_kinds() {
        assert!(FailureKind::Timeout.is_transient());
        assert!(FailureKind::Navigation.is_transient());
        assert!(FailureKind::Network.is_transient());
        assert!(!FailureKind::Element.is_transient());
        assert!(!FailureKind::Fatal.is_transient());
    }

    #[test]
    fn io_errors() {
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(timed_out.failure_kind(), FailureKind::Timeout);
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(reset.failure_kind(), FailureKind::Network);
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(denied.failure_kind(), FailureKind::Fatal);
    }
}
