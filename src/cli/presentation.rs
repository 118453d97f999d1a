//! CLI presentation: text and JSON rendering of command results.

use crate::fragment::FragmentDiff;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// One line per file, relative to `root`.
pub fn format_file_list(root: &Path, files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|file| {
            file.strip_prefix(root)
                .unwrap_or(file)
                .to_string_lossy()
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_value(value: &Value, compact: bool) -> String {
    if compact {
        return value.to_string();
    }
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Single-line JSON record describing one diff.
pub fn format_diff_line(diff: &FragmentDiff, at: DateTime<Utc>) -> String {
    let change = if diff.is_created() {
        "created"
    } else if diff.is_deleted() {
        "deleted"
    } else {
        "updated"
    };
    let current = diff.new.as_ref().or(diff.old.as_ref());

    json!({
        "timestamp": at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "change": change,
        "key": current.map(|f| f.key.to_string()),
        "file": current.map(|f| f.file.display().to_string()),
        "old": diff.old.as_ref().map(|f| &f.value),
        "new": diff.new.as_ref().map(|f| &f.value),
    })
    .to_string()
}
