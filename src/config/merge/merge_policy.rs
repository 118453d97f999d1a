//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources win key by key; tables merge, arrays are replaced whole.

use crate::watch::DEFAULT_BATCH_WINDOW_MS;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("watch.batch_window_ms", DEFAULT_BATCH_WINDOW_MS)?
        .set_default("watch.follow_symlinks", false)?
        .set_default("watch.ignore_patterns", vec![".git"])?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
