//! Failure snapshot sinks

use crate::{errors::LocatorError, types::DiagnosticContext};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Directory used by [`FsArtifactSink::default`]
pub const DEFAULT_ARTIFACT_DIR: &str = "test-results";

/// Destination for diagnostic artifacts (file system, report attachment, ...)
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persist `bytes` under `name`, returning where it ended up
    async fn store(&self, name: &str, bytes: Vec<u8>) -> Result<String, LocatorError>;
}

/// Name for a locator failure snapshot
///
/// `locator-failure-<project>-<title-slug>-<unix millis>.png`, with
/// `unknown-test` standing in when no context is available.
pub fn failure_artifact_name(context: Option<&DiagnosticContext>) -> String {
    let test_name = context
        .map(DiagnosticContext::slug)
        .unwrap_or_else(|| "unknown-test".to_string());
    format!(
        "locator-failure-{}-{}.png",
        test_name,
        chrono::Utc::now().timestamp_millis()
    )
}

/// Writes artifacts as files below a directory
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    dir: PathBuf,
}

impl FsArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl Default for FsArtifactSink {
    fn default() -> Self {
        Self::new(DEFAULT_ARTIFACT_DIR)
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn store(&self, name: &str, bytes: Vec<u8>) -> Result<String, LocatorError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| LocatorError::Artifact(format!("{}: {}", self.dir.display(), err)))?;

        let path = self.dir.join(name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|err| LocatorError::Artifact(format!("{}: {}", path.display(), err)))?;

        debug!(path = %path.display(), size = bytes.len(), "stored artifact");
        Ok(path.display().to_string())
    }
}
