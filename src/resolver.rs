//! Resolvers: pluggable matcher + deserializer pairs
//!
//! A resolver decides whether it handles a file and turns the file's bytes into
//! a [`serde_json::Value`]. Resolvers live in an immutable [`ResolverSet`]; the
//! first registered resolver that matches a path wins.

use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Capability for turning one class of files into values.
pub trait Resolver: Send + Sync {
    /// Resolver name for logging and fragment bookkeeping.
    fn name(&self) -> &str;

    /// Extensions handled by this resolver, without the leading dot.
    fn extensions(&self) -> &[String] {
        &[]
    }

    /// Check if this resolver handles the given path.
    ///
    /// Defaults to extension membership; override for other predicates.
    fn matches(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.extensions().iter().any(|e| e == ext),
            None => false,
        }
    }

    /// Final key segment for a file whose name without extension is `stem`.
    fn key_name(&self, stem: &str, _path: &Path) -> String {
        stem.to_string()
    }

    /// Turn raw file contents into a value.
    fn deserialize(&self, bytes: &[u8], path: &Path) -> anyhow::Result<Value>;
}

fn extension_list(extensions: &[&str]) -> Vec<String> {
    extensions.iter().map(|e| e.trim_start_matches('.').to_string()).collect()
}

/// Parses `.json` files.
#[derive(Debug, Clone)]
pub struct JsonResolver {
    extensions: Vec<String>,
}

impl Default for JsonResolver {
    fn default() -> Self {
        Self {
            extensions: extension_list(&["json"]),
        }
    }
}

impl Resolver for JsonResolver {
    fn name(&self) -> &str {
        "json"
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn deserialize(&self, bytes: &[u8], _path: &Path) -> anyhow::Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Parses `.toml` files into JSON values.
#[derive(Debug, Clone)]
pub struct TomlResolver {
    extensions: Vec<String>,
}

impl Default for TomlResolver {
    fn default() -> Self {
        Self {
            extensions: extension_list(&["toml"]),
        }
    }
}

impl Resolver for TomlResolver {
    fn name(&self) -> &str {
        "toml"
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn deserialize(&self, bytes: &[u8], _path: &Path) -> anyhow::Result<Value> {
        let text = std::str::from_utf8(bytes)?;
        let table: toml::Value = toml::from_str(text)?;
        Ok(serde_json::to_value(table)?)
    }
}

/// Exposes text files as string values.
#[derive(Debug, Clone)]
pub struct TextResolver {
    extensions: Vec<String>,
}

impl Default for TextResolver {
    fn default() -> Self {
        Self {
            extensions: extension_list(&["txt", "md"]),
        }
    }
}

impl TextResolver {
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extension_list(extensions),
        }
    }
}

impl Resolver for TextResolver {
    fn name(&self) -> &str {
        "text"
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn deserialize(&self, bytes: &[u8], _path: &Path) -> anyhow::Result<Value> {
        Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

type DeserializeFn = dyn Fn(&[u8], &Path) -> anyhow::Result<Value> + Send + Sync;

/// Closure-backed resolver for user supplied extension mappings.
///
/// ```
/// use lesion::resolver::FnResolver;
/// use serde_json::Value;
///
/// let lines = FnResolver::new("lines", &["lst"], |bytes, _path| {
///     let text = String::from_utf8_lossy(bytes);
///     Ok(Value::from(text.lines().map(str::to_string).collect::<Vec<_>>()))
/// });
/// ```
#[derive(Clone)]
pub struct FnResolver {
    name: String,
    extensions: Vec<String>,
    deserialize: Arc<DeserializeFn>,
}

impl FnResolver {
    pub fn new<F>(name: impl Into<String>, extensions: &[&str], deserialize: F) -> Self
    where
        F: Fn(&[u8], &Path) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            extensions: extension_list(extensions),
            deserialize: Arc::new(deserialize),
        }
    }
}

impl fmt::Debug for FnResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl Resolver for FnResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn deserialize(&self, bytes: &[u8], path: &Path) -> anyhow::Result<Value> {
        (self.deserialize)(bytes, path)
    }
}

/// Ordered, immutable collection of resolvers.
#[derive(Clone, Default)]
pub struct ResolverSet {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverSet {
    pub fn new(resolvers: Vec<Arc<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    /// JSON, TOML and text resolvers, in that order.
    pub fn builtin() -> Self {
        Self::new(vec![
            Arc::new(JsonResolver::default()),
            Arc::new(TomlResolver::default()),
            Arc::new(TextResolver::default()),
        ])
    }

    /// Append a resolver, consuming the set.
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// First resolver (in registration order) that matches `path`.
    pub fn find(&self, path: &Path) -> Option<&dyn Resolver> {
        self.resolvers
            .iter()
            .find(|r| r.matches(path))
            .map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }
}

impl fmt::Debug for ResolverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
