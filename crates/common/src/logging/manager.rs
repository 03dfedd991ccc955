//! Logging initialization.

use std::{fs, io};

use thiserror::Error;
use tracing::info;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use super::types::LoggerConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level {0:?}")]
    InvalidLevel(String),

    #[error("failed to create log directory {path}: {source}")]
    LogDir { path: String, source: io::Error },

    #[error("failed to open log file: {0}")]
    FileAppender(String),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Builds the filter: `RUST_LOG` when set, the configured default otherwise.
pub fn build_filter(config: &LoggerConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.default_level.into())
        .from_env_lossy()
}

/// Installs the global subscriber: a stderr layer plus an optional rolling
/// file layer.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let filt = build_filter(&config);

    let stderr_layer = if config.stderr_config.json_format {
        layer()
            .json()
            .with_writer(io::stderr)
            .with_span_events(config.stderr_config.fmt_span.clone())
            .with_filter(filt.clone())
            .boxed()
    } else {
        layer()
            .compact()
            .with_writer(io::stderr)
            .with_ansi(config.stderr_config.ansi)
            .with_span_events(config.stderr_config.fmt_span.clone())
            .with_filter(filt.clone())
            .boxed()
    };

    let file_layer = match config.file_logging_config.as_ref() {
        Some(file_config) => {
            fs::create_dir_all(&file_config.directory).map_err(|source| {
                LoggingError::LogDir {
                    path: file_config.directory.display().to_string(),
                    source,
                }
            })?;
            let file_appender = RollingFileAppender::builder()
                .rotation(file_config.rotation.clone())
                .filename_prefix(&file_config.file_name_prefix)
                .build(&file_config.directory)
                .map_err(|e| LoggingError::FileAppender(e.to_string()))?;

            let file_sub = if file_config.json_format {
                layer()
                    .json()
                    .with_writer(file_appender)
                    .with_ansi(false) // No color codes in files
                    .with_filter(filt.clone())
                    .boxed()
            } else {
                layer()
                    .compact()
                    .with_writer(file_appender)
                    .with_ansi(false) // No color codes in files
                    .with_filter(filt.clone())
                    .boxed()
            };
            Some(file_sub)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    info!(service_name = %config.service_name, "logging initialized");
    Ok(())
}
