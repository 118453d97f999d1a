//! Configuration System
//!
//! Layered configuration for the `lesion` binary and for embedders that want
//! the same knobs: built-in defaults, a global user file, an explicit file,
//! then `LESION_`-prefixed environment variables.

use crate::logging::{LogFormat, LoggingConfig, Output};
use crate::tree::walker::WalkerConfig;
use crate::watch::DEFAULT_BATCH_WINDOW_MS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Upper bound on the batch window
pub const MAX_BATCH_WINDOW_MS: u64 = 60_000;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LesionConfig {
    /// Store root (the CLI argument wins when given)
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Walking and watching
    #[serde(default)]
    pub watch: WatchSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Watch and walk settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSettings {
    /// How long raw filesystem events are coalesced into one batch
    #[serde(default = "default_batch_window_ms")]
    pub batch_window_ms: u64,

    #[serde(default)]
    pub follow_symlinks: bool,

    /// Path components skipped by the walk and by incoming events
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    #[serde(default)]
    pub max_depth: Option<usize>,
}

fn default_batch_window_ms() -> u64 {
    DEFAULT_BATCH_WINDOW_MS
}

fn default_ignore_patterns() -> Vec<String> {
    WalkerConfig::default().ignore_patterns
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            batch_window_ms: default_batch_window_ms(),
            follow_symlinks: false,
            ignore_patterns: default_ignore_patterns(),
            max_depth: None,
        }
    }
}

impl WatchSettings {
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            ignore_patterns: self.ignore_patterns.clone(),
            max_depth: self.max_depth,
        }
    }

    /// Validate watch settings
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_window_ms == 0 {
            return Err("batch_window_ms must be greater than zero".to_string());
        }
        if self.batch_window_ms > MAX_BATCH_WINDOW_MS {
            return Err(format!(
                "batch_window_ms must be at most {} (got {})",
                MAX_BATCH_WINDOW_MS, self.batch_window_ms
            ));
        }
        for pattern in &self.ignore_patterns {
            if pattern.is_empty() {
                return Err("ignore_patterns cannot contain an empty pattern".to_string());
            }
            if pattern.contains('/') || pattern.contains('\\') {
                return Err(format!(
                    "ignore pattern '{}' must be a single path component",
                    pattern
                ));
            }
        }
        if self.max_depth == Some(0) {
            return Err("max_depth must be at least 1 when set".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Root(String),
    Watch(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Root(msg) => write!(f, "Root: {}", msg),
            ValidationError::Watch(msg) => write!(f, "Watch: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

fn validate_logging(logging: &LoggingConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        problems.push(format!("unknown level '{}'", logging.level));
    }
    if let Err(e) = logging.format.parse::<LogFormat>() {
        problems.push(e);
    }
    if let Err(e) = logging.output.parse::<Output>() {
        problems.push(e);
    }
    for (module, level) in &logging.modules {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            problems.push(format!("unknown level '{}' for module '{}'", level, module));
        }
    }
    problems
}

impl LesionConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(root) = &self.root {
            if root.as_os_str().is_empty() {
                errors.push(ValidationError::Root("root cannot be empty".to_string()));
            }
        }

        if let Err(e) = self.watch.validate() {
            errors.push(ValidationError::Watch(e));
        }

        errors.extend(
            validate_logging(&self.logging)
                .into_iter()
                .map(ValidationError::Logging),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
