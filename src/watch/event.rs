//! Filesystem change events

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Deleted,
    Modified,
    Renamed,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Created => "created",
            ChangeAction::Deleted => "deleted",
            ChangeAction::Modified => "modified",
            ChangeAction::Renamed => "renamed",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem change event
///
/// `created` carries only `new_file`, `deleted` only `old_file`; `modified`
/// and `renamed` carry both (equal for a plain modification). Use the
/// constructors to keep those shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChangeEvent {
    pub action: ChangeAction,
    pub old_file: Option<PathBuf>,
    pub new_file: Option<PathBuf>,
}

impl ChangeEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            action: ChangeAction::Created,
            old_file: None,
            new_file: Some(path.into()),
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            action: ChangeAction::Deleted,
            old_file: Some(path.into()),
            new_file: None,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            action: ChangeAction::Modified,
            old_file: Some(path.clone()),
            new_file: Some(path),
        }
    }

    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            action: ChangeAction::Renamed,
            old_file: Some(from.into()),
            new_file: Some(to.into()),
        }
    }

    pub fn old_file(&self) -> Option<&Path> {
        self.old_file.as_deref()
    }

    pub fn new_file(&self) -> Option<&Path> {
        self.new_file.as_deref()
    }

    /// Every path this event touches.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.old_file().into_iter().chain(
            self.new_file()
                .filter(|new| Some(*new) != self.old_file()),
        )
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.old_file(), self.new_file()) {
            (Some(old), Some(new)) if old != new => {
                write!(f, "{} {} -> {}", self.action, old.display(), new.display())
            }
            (_, Some(path)) | (Some(path), None) => {
                write!(f, "{} {}", self.action, path.display())
            }
            (None, None) => write!(f, "{}", self.action),
        }
    }
}
