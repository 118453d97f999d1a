//! CLI output: error mapping from store errors to stable CLI surface.

use crate::error::StoreError;

/// Map store errors to a string for CLI output.
pub fn map_error(e: &StoreError) -> String {
    match e {
        StoreError::RootNotFound(path) => format!("No such directory: {}", path.display()),
        StoreError::Config(msg) => format!("Invalid configuration: {}", msg),
        other => other.to_string(),
    }
}
