//! Locator fallback chain - ordered element resolution
//!
//! This crate implements the element location core used by page objects:
//! - Structural (CSS) descriptors, tried as direct queries
//! - Pathed (XPath) descriptors, tried as hierarchical queries
//! - Textual descriptors, tried as visible-text queries
//! - Per-descriptor polling with linear backoff
//! - Best-effort failure snapshots when every descriptor is exhausted

pub mod artifacts;
pub mod document;
pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use artifacts::*;
pub use document::*;
pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
