//! Layered configuration
//!
//! Built-in defaults, then YAML files, then `RESILIENCE__` environment
//! variables (`__` separates path segments) and finally a JSON blob in
//! `RESILIENCE_OVERRIDE_JSON`. The merged result is validated before use.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use action_locator::{
    DefaultElementResolver, FsArtifactSink, PollBackoff, ResolveOptions,
    DEFAULT_ARTIFACT_DIR, DEFAULT_DESCRIPTOR_TIMEOUT_MS, DEFAULT_POLL_STEP_MS,
    DEFAULT_SNAPSHOT_TIMEOUT_MS,
};
use action_retry::BackoffConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::ConfigError;

const ENV_PREFIX: &str = "RESILIENCE__";
const ENV_JSON: &str = "RESILIENCE_OVERRIDE_JSON";

/// Element resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Budget given to each descriptor
    pub default_timeout_ms: u64,

    /// Linear poll step
    pub poll_step_ms: u64,

    /// Upper bound on the failure snapshot
    pub snapshot_timeout_ms: u64,

    /// Where failure snapshots go; `None` disables capture
    pub artifact_dir: Option<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_DESCRIPTOR_TIMEOUT_MS,
            poll_step_ms: DEFAULT_POLL_STEP_MS,
            snapshot_timeout_ms: DEFAULT_SNAPSHOT_TIMEOUT_MS,
            artifact_dir: Some(DEFAULT_ARTIFACT_DIR.to_string()),
        }
    }
}

impl LocatorConfig {
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions::default().with_timeout(Duration::from_millis(self.default_timeout_ms))
    }

    pub fn poll_backoff(&self) -> PollBackoff {
        PollBackoff::new(Duration::from_millis(self.poll_step_ms))
    }

    /// Resolver configured with these settings
    pub fn build_resolver(&self) -> DefaultElementResolver {
        let resolver = DefaultElementResolver::new()
            .with_poll_backoff(self.poll_backoff())
            .with_snapshot_timeout(Duration::from_millis(self.snapshot_timeout_ms));
        match &self.artifact_dir {
            Some(dir) => resolver.with_artifact_sink(Arc::new(FsArtifactSink::new(dir))),
            None => resolver,
        }
    }
}

/// Retry presets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Used by callers that do not pick a preset
    pub default: BackoffConfig,

    /// Navigation and load-state operations
    pub page: BackoffConfig,

    /// Element resolution
    pub locator: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            default: BackoffConfig::default(),
            page: BackoffConfig::page(),
            locator: BackoffConfig::locator(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub locator: LocatorConfig,
    pub retry: RetryConfig,
}

impl ResilienceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sections = [
            ("default", &self.retry.default),
            ("page", &self.retry.page),
            ("locator", &self.retry.locator),
        ];
        for (section, backoff) in sections {
            backoff
                .validate()
                .map_err(|source| ConfigError::Backoff { section, source })?;
        }
        if let Some(dir) = &self.locator.artifact_dir {
            if dir.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "locator.artifact_dir must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
        }
    }
}

/// Load defaults, the optional file and the environment
pub fn load_config(path: Option<&Path>) -> Result<ResilienceConfig, ConfigError> {
    let mut options = LoadOptions::default();
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    options.include_env = true;
    load_config_with_options(&options)
}

pub fn load_config_with_options(options: &LoadOptions) -> Result<ResilienceConfig, ConfigError> {
    let mut tree = serde_json::to_value(ResilienceConfig::default())
        .map_err(|err| ConfigError::Invalid(format!("{}", err)))?;

    for path in &options.paths {
        if path.exists() {
            debug!("Applying config file {}", path.display());
            merge_document(&mut tree, read_yaml(path)?)?;
        } else {
            debug!("Config file {} not found, skipping", path.display());
        }
    }

    if options.include_env {
        apply_env(&mut tree)?;
    }

    let config: ResilienceConfig =
        serde_json::from_value(tree).map_err(|err| ConfigError::Invalid(format!("{}", err)))?;
    config.validate()?;
    Ok(config)
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|err| ConfigError::Io(format!("{}: {}", path.display(), err)))?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|err| ConfigError::Invalid(format!("{}: {}", path.display(), err)))?;
    serde_json::to_value(yaml).map_err(|err| ConfigError::Invalid(format!("{}", err)))
}

/// Merge a whole document (file or JSON blob); an empty document is a no-op
fn merge_document(tree: &mut Value, document: Value) -> Result<(), ConfigError> {
    if document.is_null() {
        return Ok(());
    }
    merge_at(tree, document, "")
}

/// Overlay `value` onto `node`, recursing through objects
///
/// Keys must already exist in the defaults; leaves replace leaves only.
fn merge_at(node: &mut Value, value: Value, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = key.trim().to_ascii_lowercase();
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                let slot = node
                    .as_object_mut()
                    .and_then(|fields| fields.get_mut(&key))
                    .ok_or_else(|| ConfigError::UnsupportedPath(child_path.clone()))?;
                merge_at(slot, child, &child_path)?;
            }
            Ok(())
        }
        _ if node.is_object() => Err(ConfigError::UnsupportedPath(path.to_string())),
        leaf => {
            *node = leaf;
            Ok(())
        }
    }
}

/// Replace the leaf at dotted `path` below `tree`
fn apply_override(tree: &mut Value, path: &str, value: Value) -> Result<(), ConfigError> {
    let mut node = tree;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        node = node
            .as_object_mut()
            .and_then(|fields| fields.get_mut(segment))
            .ok_or_else(|| ConfigError::UnsupportedPath(path.to_string()))?;
    }
    if node.is_object() {
        return Err(ConfigError::UnsupportedPath(path.to_string()));
    }
    *node = value;
    Ok(())
}

/// `RESILIENCE__RETRY__PAGE__MAX_RETRIES=4` sets `retry.page.max_retries`,
/// then `RESILIENCE_OVERRIDE_JSON` is merged on top
fn apply_env(tree: &mut Value) -> Result<(), ConfigError> {
    for (key, raw) in env::vars() {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        if !path.is_empty() {
            apply_override(tree, &path, env_value(&raw))?;
        }
    }

    match env::var(ENV_JSON) {
        Ok(raw_json) if !raw_json.trim().is_empty() => {
            let document: Value = serde_json::from_str(&raw_json)
                .map_err(|err| ConfigError::Invalid(format!("{}: {}", ENV_JSON, err)))?;
            merge_document(tree, document)
        }
        _ => Ok(()),
    }
}

/// JSON scalar when it parses as one, plain string otherwise; empty is null
fn env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
