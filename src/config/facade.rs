//! Configuration loader: assembles sources in precedence order and validates.

use super::merge::merge_policy;
use super::sources::{environment, explicit_file, global_file};
use super::LesionConfig;
use crate::error::StoreError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`LesionConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    ///
    /// Precedence (highest last): built-in defaults, the global user file,
    /// `explicit` when given, then `LESION_*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<LesionConfig, StoreError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = global_file::add_to_builder(builder)?;
        if let Some(path) = explicit {
            builder = explicit_file::add_to_builder(builder, path)?;
        }
        builder = environment::add_to_builder(builder);

        let config: LesionConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    /// Load a single file over the built-in defaults, ignoring other sources.
    pub fn load_from_file(path: &Path) -> Result<LesionConfig, StoreError> {
        let builder = explicit_file::add_to_builder(merge_policy::builder_with_defaults()?, path)?;
        let config: LesionConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    /// Location of the global configuration file, whether or not it exists.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    fn validated(config: LesionConfig) -> Result<LesionConfig, StoreError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            StoreError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        debug!(
            batch_window_ms = config.watch.batch_window_ms,
            "Configuration loaded"
        );
        Ok(config)
    }
}
