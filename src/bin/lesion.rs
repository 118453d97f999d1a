//! Lesion CLI Binary
//!
//! Command-line interface for the lesion configuration store.

use clap::Parser;
use lesion::cli::{map_error, Cli, RunContext};
use lesion::config::{ConfigLoader, LesionConfig};
use lesion::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    // Initialize logging early
    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Lesion CLI starting");

    let context = RunContext::new(config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match context.execute(&cli.command, &mut out) {
        Ok(()) => info!("Command completed successfully"),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Logging configuration from the config file, overridden by CLI flags.
fn build_logging_config(cli: &Cli, config: &LesionConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();

    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    if cli.quiet {
        logging.level = "off".to_string();
        logging.modules.clear();
    }

    logging
}
