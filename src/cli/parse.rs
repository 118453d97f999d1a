//! CLI parse: clap types for lesion. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lesion CLI - live configuration assembled from a directory tree
#[derive(Parser, Debug)]
#[command(name = "lesion")]
#[command(about = "Assemble and watch a directory tree of configuration fragments")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Disable logging entirely
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every file below the root
    Walk {
        /// Store root (defaults to the configured root, then ".")
        root: Option<PathBuf>,
    },
    /// Print the assembled value as JSON
    Fetch {
        root: Option<PathBuf>,
        /// Single-line output
        #[arg(long)]
        compact: bool,
    },
    /// Print the assembled value, then one JSON line per change
    Watch { root: Option<PathBuf> },
}

impl Commands {
    pub fn root(&self) -> Option<&PathBuf> {
        match self {
            Commands::Walk { root } | Commands::Fetch { root, .. } | Commands::Watch { root } => {
                root.as_ref()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Commands::Walk { .. } => "walk",
            Commands::Fetch { .. } => "fetch",
            Commands::Watch { .. } => "watch",
        }
    }
}
