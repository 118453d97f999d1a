//! CLI route: run context and command dispatch.

use crate::cli::parse::Commands;
use crate::cli::presentation::{format_diff_line, format_file_list, format_value};
use crate::config::LesionConfig;
use crate::error::{StoreError, WatchError};
use crate::resolver::ResolverSet;
use crate::store::{fetch_with_config, Store, StoreOptions};
use crate::tree::path::canonicalize_path;
use crate::tree::walker::Walker;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{info, warn};

enum WatchMessage {
    Line(String),
    Failed(String),
}

/// Runtime context for CLI execution: loaded configuration and resolvers.
pub struct RunContext {
    config: LesionConfig,
    resolvers: ResolverSet,
}

impl RunContext {
    pub fn new(config: LesionConfig) -> Self {
        Self::with_resolvers(config, ResolverSet::builtin())
    }

    pub fn with_resolvers(config: LesionConfig, resolvers: ResolverSet) -> Self {
        Self { config, resolvers }
    }

    pub fn config(&self) -> &LesionConfig {
        &self.config
    }

    /// Root for `command`: the CLI argument, then the configured root, then ".".
    pub fn resolve_root(&self, command: &Commands) -> PathBuf {
        command
            .root()
            .cloned()
            .or_else(|| self.config.root.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Run `command`, writing its output to `out`.
    ///
    /// `watch` only returns once the watcher fails.
    pub fn execute(&self, command: &Commands, out: &mut dyn Write) -> Result<(), StoreError> {
        let root = self.resolve_root(command);
        info!(command = command.name(), root = %root.display(), "Executing command");

        match command {
            Commands::Walk { .. } => self.handle_walk(root, out),
            Commands::Fetch { compact, .. } => self.handle_fetch(root, *compact, out),
            Commands::Watch { .. } => self.handle_watch(root, out),
        }
    }

    fn handle_walk(&self, root: PathBuf, out: &mut dyn Write) -> Result<(), StoreError> {
        if !root.is_dir() {
            return Err(StoreError::RootNotFound(root));
        }
        let root = canonicalize_path(&root)?;
        let files = Walker::with_config(root.clone(), self.config.watch.walker_config()).walk();
        if !files.is_empty() {
            writeln!(out, "{}", format_file_list(&root, &files))?;
        }
        Ok(())
    }

    fn handle_fetch(
        &self,
        root: PathBuf,
        compact: bool,
        out: &mut dyn Write,
    ) -> Result<(), StoreError> {
        let value = fetch_with_config(
            &root,
            &self.resolvers,
            self.config.watch.walker_config(),
        )?;
        writeln!(out, "{}", format_value(&value, compact))?;
        Ok(())
    }

    fn handle_watch(&self, root: PathBuf, out: &mut dyn Write) -> Result<(), StoreError> {
        let options = StoreOptions::from_config(&self.config, self.resolvers.clone());
        let store = Store::open(&root, options)?;

        let (tx, rx) = mpsc::channel();
        let _changes = {
            let tx = tx.clone();
            store.on_change(move |diff| {
                let _ = tx.send(WatchMessage::Line(format_diff_line(diff, chrono::Utc::now())));
            })
        };
        let _faults = store.on_error(move |fault| {
            if fault.is_terminal() {
                let _ = tx.send(WatchMessage::Failed(fault.to_string()));
            } else {
                warn!(error = %fault, "Skipping unresolvable file");
            }
        });

        writeln!(out, "{}", format_value(&store.value(), true))?;
        out.flush()?;

        for message in rx {
            match message {
                WatchMessage::Line(line) => {
                    writeln!(out, "{}", line)?;
                    out.flush()?;
                }
                WatchMessage::Failed(details) => {
                    store.close();
                    return Err(StoreError::Watch(WatchError::EventError { details }));
                }
            }
        }
        Ok(())
    }
}
