//! Error types for the lesion store.

use std::path::PathBuf;
use thiserror::Error;

/// A file matched a resolver but could not be turned into a fragment.
///
/// Always scoped to a single file; the engine reports it and moves on.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Resolver '{resolver}' failed to deserialize {path:?}: {source}")]
    Deserialize {
        path: PathBuf,
        resolver: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ResolutionError {
    /// The file that failed to resolve
    pub fn path(&self) -> &PathBuf {
        match self {
            ResolutionError::Io { path, .. } | ResolutionError::Deserialize { path, .. } => path,
        }
    }
}

/// Errors from the change notifier.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path:?}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Non-fatal and terminal problems reported to `on_error` subscribers
#[derive(Debug, Error)]
pub enum StoreFault {
    /// One file could not be resolved; the store keeps running.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The notifier died; no further changes will be observed.
    #[error("Store watch failed: {0}")]
    Watch(#[from] WatchError),
}

impl StoreFault {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StoreFault::Watch(_))
    }
}

/// Store-level errors surfaced from construction and one-shot operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store root not found: {0:?}")]
    RootNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store task failed: {0}")]
    Task(String),
}

impl From<config::ConfigError> for StoreError {
    fn from(err: config::ConfigError) -> Self {
        StoreError::Config(err.to_string())
    }
}
