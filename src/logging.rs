//! Logging System
//!
//! Structured logging using the `tracing` crate. The library only emits events;
//! binaries call [`init_logging`] once to install a subscriber.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directives, e.g. `lesion=debug,notify=warn`
pub const LOG_FILTER_ENV: &str = "LESION_LOG";
pub const LOG_FORMAT_ENV: &str = "LESION_LOG_FORMAT";
pub const LOG_OUTPUT_ENV: &str = "LESION_LOG_OUTPUT";

/// Logging configuration as written in config files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    pub level: String,
    /// text or json
    pub format: String,
    /// stdout, stderr or file
    pub output: String,
    /// Log file path when `output` is "file"
    pub file: PathBuf,
    /// ANSI colors for text output on a terminal stream
    pub color: bool,
    /// Per-module level overrides
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text.as_str().to_string(),
            output: Output::Stderr.as_str().to_string(),
            file: PathBuf::from("lesion.log"),
            color: true,
            modules: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Stderr,
    File,
}

impl Output {
    pub fn as_str(self) -> &'static str {
        match self {
            Output::Stdout => "stdout",
            Output::Stderr => "stderr",
            Output::File => "file",
        }
    }
}

impl FromStr for Output {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(Output::Stdout),
            "stderr" => Ok(Output::Stderr),
            "file" => Ok(Output::File),
            other => Err(format!(
                "unknown log output '{}' (expected stdout, stderr or file)",
                other
            )),
        }
    }
}

/// Effective settings after environment overrides.
#[derive(Debug, Clone, PartialEq)]
struct Resolved {
    directives: String,
    format: LogFormat,
    output: Output,
    file: PathBuf,
    color: bool,
}

impl Resolved {
    fn from_sources<E>(config: &LoggingConfig, env: E) -> Result<Self, StoreError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let directives = match env(LOG_FILTER_ENV) {
            Some(directives) if !directives.trim().is_empty() => directives,
            _ => config_directives(config),
        };
        let format = env(LOG_FORMAT_ENV)
            .unwrap_or_else(|| config.format.clone())
            .parse::<LogFormat>()
            .map_err(StoreError::Config)?;
        let output = env(LOG_OUTPUT_ENV)
            .unwrap_or_else(|| config.output.clone())
            .parse::<Output>()
            .map_err(StoreError::Config)?;

        Ok(Self {
            directives,
            format,
            output,
            file: config.file.clone(),
            color: config.color && output != Output::File,
        })
    }

    fn writer(&self) -> Result<BoxMakeWriter, StoreError> {
        Ok(match self.output {
            Output::Stdout => BoxMakeWriter::new(std::io::stdout),
            Output::Stderr => BoxMakeWriter::new(std::io::stderr),
            Output::File => {
                if let Some(parent) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.file)?;
                BoxMakeWriter::new(std::sync::Mutex::new(file))
            }
        })
    }
}

// "off" silences module overrides too.
fn config_directives(config: &LoggingConfig) -> String {
    if config.level.eq_ignore_ascii_case("off") {
        return "off".to_string();
    }
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();
    std::iter::once(config.level.clone())
        .chain(modules.into_iter().map(|(module, level)| format!("{}={}", module, level)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the logging system
///
/// `LESION_LOG`, `LESION_LOG_FORMAT` and `LESION_LOG_OUTPUT` override the
/// given configuration. Fails if a global subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), StoreError> {
    let defaults = LoggingConfig::default();
    let settings = Resolved::from_sources(config.unwrap_or(&defaults), |name| {
        std::env::var(name).ok()
    })?;

    let filter = EnvFilter::try_new(&settings.directives)
        .map_err(|e| StoreError::Config(format!("Invalid log filter: {}", e)))?;
    let writer = settings.writer()?;
    let registry = Registry::default().with(filter);

    let installed = match settings.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(settings.color)
                    .with_writer(writer),
            )
            .try_init(),
    };

    installed.map_err(|e| StoreError::Config(format!("Failed to install logger: {}", e)))
}
