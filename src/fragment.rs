//! Fragments: the (key, value) pair a single file contributes to the store
//!
//! Keys are derived from the file's location below the store root: each
//! directory becomes a segment, followed by the file name without its
//! extension. Values come from the first resolver that matches the file.

use crate::error::ResolutionError;
use crate::resolver::{Resolver, ResolverSet};
use crate::tree::path::normalize_segment;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Delimiter used by the string form of a key.
pub const KEY_DELIMITER: char = '.';

/// Ordered key segments locating a fragment in the assembled value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentKey(Vec<String>);

impl FragmentKey {
    /// Build a key from segments, dropping empty ones.
    ///
    /// Segments are NFC-normalized so keys derived from NFD file names
    /// compare equal to keys typed by callers.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            segments
                .into_iter()
                .filter(|s| !s.as_ref().is_empty())
                .map(|s| normalize_segment(s.as_ref()))
                .collect(),
        )
    }

    /// Parse a delimited key such as `config.db`.
    ///
    /// Every `.` splits, so a key whose segments themselves contain a dot
    /// (from `x/archive.tar.json` or a `v1.2/` directory) cannot be written
    /// in this form; build it with [`FragmentKey::new`] instead.
    pub fn parse(key: &str) -> Self {
        Self::new(key.split(KEY_DELIMITER))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(&KEY_DELIMITER.to_string()))
    }
}

impl From<&str> for FragmentKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

impl From<String> for FragmentKey {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

impl From<Vec<String>> for FragmentKey {
    fn from(segments: Vec<String>) -> Self {
        Self::new(segments)
    }
}

impl From<&[&str]> for FragmentKey {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for FragmentKey {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

/// A resolved file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    /// Absolute path of the source file
    pub file: PathBuf,
    /// Position in the assembled value
    pub key: FragmentKey,
    /// Name of the resolver that produced `value`
    pub resolver: String,
    pub value: Value,
}

/// Before/after pair emitted for every cache mutation.
///
/// At least one side is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentDiff {
    pub old: Option<Fragment>,
    pub new: Option<Fragment>,
}

impl FragmentDiff {
    pub fn created(fragment: Fragment) -> Self {
        Self {
            old: None,
            new: Some(fragment),
        }
    }

    pub fn deleted(fragment: Fragment) -> Self {
        Self {
            old: Some(fragment),
            new: None,
        }
    }

    pub fn is_created(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    pub fn is_updated(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }
}

/// Derive the key for `file` below `root`.
///
/// Returns `None` when `file` is not strictly below `root`.
pub fn derive_key(root: &Path, file: &Path, resolver: &dyn Resolver) -> Option<FragmentKey> {
    let relative = file.strip_prefix(root).ok()?;
    let stem = relative.file_stem()?.to_string_lossy();

    let mut segments: Vec<String> = match relative.parent() {
        Some(parent) => parent
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    };
    segments.push(resolver.key_name(&stem, file));

    Some(FragmentKey::new(segments))
}

/// Resolve `file` into a fragment.
///
/// `Ok(None)` means the file is not part of the store: no resolver matches,
/// it lies outside `root`, or it disappeared before it could be read.
pub fn resolve_fragment(
    root: &Path,
    resolvers: &ResolverSet,
    file: &Path,
) -> Result<Option<Fragment>, ResolutionError> {
    let Some(resolver) = resolvers.find(file) else {
        trace!(path = %file.display(), "No resolver for file");
        return Ok(None);
    };

    let Some(key) = derive_key(root, file, resolver) else {
        debug!(path = %file.display(), root = %root.display(), "File is outside the store root");
        return Ok(None);
    };

    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %file.display(), "File vanished before it could be read");
            return Ok(None);
        }
        Err(source) => {
            return Err(ResolutionError::Io {
                path: file.to_path_buf(),
                source,
            })
        }
    };

    let value = resolver
        .deserialize(&bytes, file)
        .map_err(|source| ResolutionError::Deserialize {
            path: file.to_path_buf(),
            resolver: resolver.name().to_string(),
            source,
        })?;

    Ok(Some(Fragment {
        file: file.to_path_buf(),
        key,
        resolver: resolver.name().to_string(),
        value,
    }))
}

/// Fold fragments into one nested value.
///
/// Shallower keys are applied first so deeper keys win collisions; equal
/// depths keep their input order.
pub fn assemble<'a, I>(fragments: I) -> Value
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut ordered: Vec<&Fragment> = fragments.into_iter().collect();
    ordered.sort_by_key(|f| f.key.len());

    let mut result = Value::Object(Map::new());
    for fragment in ordered {
        set_path(&mut result, fragment.key.segments(), fragment.value.clone());
    }
    result
}

/// Set `value` at `segments`, replacing any non-object on the way.
fn set_path(target: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = target;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.clone(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
