//! Filesystem traversal and path utilities

pub mod path;
pub mod walker;

pub use walker::{Walker, WalkerConfig};
