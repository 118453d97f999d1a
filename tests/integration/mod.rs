//! Integration tests for the lesion store

mod cli_commands;
mod config_loading;
mod fs_watch;
mod key_properties;
pub mod test_utils;
