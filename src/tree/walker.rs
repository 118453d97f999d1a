//! Filesystem walker enumerating the files of a store

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Filesystem walker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false)
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Path components to skip anywhere below the root (e.g. ".git")
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    #[serde(default)]
    pub max_depth: Option<usize>,
}

fn default_ignore_patterns() -> Vec<String> {
    vec![".git".to_string()]
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: default_ignore_patterns(),
            max_depth: None,
        }
    }
}

/// Filesystem walker
///
/// Ignore patterns are evaluated against the components of a path relative to
/// the walker root, so a store that itself lives below a `.git` directory still
/// walks normally.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Walk the whole root.
    pub fn walk(&self) -> Vec<PathBuf> {
        self.walk_path(&self.root)
    }

    /// Collect every file at or below `path`, sorted.
    ///
    /// A missing path yields nothing and a plain file yields itself. Entries
    /// that vanish mid-walk are skipped, and so is anything deeper than
    /// `max_depth` below the root.
    pub fn walk_path(&self, path: &Path) -> Vec<PathBuf> {
        if self.is_ignored(path) {
            return Vec::new();
        }
        let Some(depth) = self.remaining_depth(path) else {
            debug!(path = %path.display(), "Walk target below max depth");
            return Vec::new();
        };

        let mut files = Vec::new();
        let walker = WalkDir::new(path)
            .follow_links(self.config.follow_symlinks)
            .max_depth(depth);

        let iter = walker.into_iter().filter_entry(|entry| !self.is_ignored(entry.path()));
        for entry in iter {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::NotFound) {
                        debug!(path = %path.display(), "Walk target vanished");
                    } else {
                        warn!(path = %path.display(), error = %e, "Failed to walk entry");
                    }
                    continue;
                }
            };

            // Symlinks are only reported as files when followed.
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        files.sort();
        files
    }

    /// Check whether any component below the root matches an ignore pattern
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.config.ignore_patterns.is_empty() {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                self.config
                    .ignore_patterns
                    .iter()
                    .any(|pattern| pattern.as_str() == name)
            }
            _ => false,
        })
    }

    // max_depth is measured from the root even when walking a subtree.
    // None when `path` itself already lies beyond it.
    fn remaining_depth(&self, path: &Path) -> Option<usize> {
        match self.config.max_depth {
            None => Some(usize::MAX),
            Some(max) => {
                let consumed = path
                    .strip_prefix(&self.root)
                    .map(|rel| rel.components().count())
                    .unwrap_or(0);
                max.checked_sub(consumed)
            }
        }
    }
}
