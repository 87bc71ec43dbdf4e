// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for cellnet tools
//!
//! Console output is always installed. With the `file-logging` feature and a
//! configured `logging.file_dir`, a daily-rolling JSON log file is added.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cellnet_config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

/// Logging initialization result
///
/// Holds the non-blocking writer guards; logs are flushed when it is dropped.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&std::path::Path> {
        self.log_dir.as_deref()
    }
}

/// Build the `EnvFilter` for the configured level and debug flags
pub fn build_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<EnvFilter> {
    let filter = debug_flags.to_filter_string(&config.level);
    EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter: {}", filter))
}

/// Initialize the global tracing subscriber
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags for filtering
/// * `config` - Level, console format and optional log directory
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = build_filter(debug_flags, config)?;

    let mut layers = Vec::new();

    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_filter(env_filter)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let mut file_guards = Vec::new();

    #[cfg(feature = "file-logging")]
    if let Some(dir) = &config.file_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        let file_appender = tracing_appender::rolling::daily(dir, "cellnet.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guards.push(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(build_filter(debug_flags, config)?)
            .boxed();
        layers.push(file_layer);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("Global tracing subscriber already installed")?;

    #[cfg(feature = "file-logging")]
    let log_dir = config.file_dir.clone();
    #[cfg(not(feature = "file-logging"))]
    let log_dir: Option<PathBuf> = None;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_debug_flags() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-cellnet-ingest".to_string()]);
        let config = LoggingConfig::default();
        assert!(build_filter(&flags, &config).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage_level() {
        let flags = CrateDebugFlags::default();
        let config = LoggingConfig {
            level: "cellnet-ingest=loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(build_filter(&flags, &config).is_err());
    }
}
