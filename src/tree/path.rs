//! Path canonicalization and normalization utilities

use crate::error::StoreError;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a path
///
/// Resolves symlinks, `..` and `.`, and strips trailing separators. Unicode is
/// left untouched so canonical paths still prefix the raw paths reported by
/// the OS watcher.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, StoreError> {
    // Use dunce for cross-platform canonicalization
    let canonical = dunce::canonicalize(path).map_err(|e| {
        StoreError::InvalidPath(format!("Failed to canonicalize {:?}: {}", path, e))
    })?;

    Ok(PathBuf::from(trim_trailing_separators(&canonical.to_string_lossy())))
}

/// Remove trailing separators (except for the filesystem root)
pub fn trim_trailing_separators(path: &str) -> String {
    let mut result = path.to_string();
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }

    result
}

/// NFC-normalize a single key segment
pub fn normalize_segment(segment: &str) -> String {
    segment.nfc().collect()
}

/// True when `path` equals `base` or lies beneath it.
///
/// Compares whole path components, so `/root/foo` does not contain
/// `/root/foobar`.
pub fn is_within(path: &Path, base: &Path) -> bool {
    path.starts_with(base)
}

/// Re-anchor `path` from under `from` to under `to`.
///
/// Returns `None` when `path` is not within `from`.
pub fn rebase(path: &Path, from: &Path, to: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(from).ok()?;
    if relative.as_os_str().is_empty() {
        Some(to.to_path_buf())
    } else {
        Some(to.join(relative))
    }
}
