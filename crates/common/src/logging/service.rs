//! Logging initialization for binaries.

use std::{path::Path, str::FromStr};

use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use super::{init, FileLoggingConfig, LoggerConfig, LoggingError};

/// Configuration parameters for logging initialization.
#[derive(Debug)]
pub struct LoggingInitConfig<'a> {
    pub service_name: &'a str,
    /// Default level, `RUST_LOG` still takes precedence
    pub level: &'a str,
    /// Directory for file-based logging
    pub log_dir: Option<&'a Path>,
    /// Prefix for log file names
    pub log_file_prefix: Option<&'a str>,
    /// Use JSON format instead of compact
    pub json_format: bool,
    /// Default log file prefix if not specified in config
    pub default_log_prefix: &'a str,
}

/// Resolves a level name such as `info` or `debug`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    LevelFilter::from_str(level.trim()).map_err(|_| LoggingError::InvalidLevel(level.to_owned()))
}

/// Builds the [`LoggerConfig`] described by `config`.
pub fn logger_config(config: &LoggingInitConfig<'_>) -> Result<LoggerConfig, LoggingError> {
    let mut lconfig = LoggerConfig::new(config.service_name.to_owned())
        .with_default_level(parse_level(config.level)?)
        .with_json_logging(config.json_format);

    if let Some(dir) = config.log_dir {
        let prefix = config
            .log_file_prefix
            .unwrap_or(config.default_log_prefix)
            .to_owned();
        lconfig = lconfig.with_file_logging(
            FileLoggingConfig::new(dir.to_path_buf(), prefix).with_json_format(config.json_format),
        );
    }
    Ok(lconfig)
}

/// Initialize logging from configuration with all standard setup.
pub fn init_logging_from_config(config: LoggingInitConfig<'_>) -> Result<(), LoggingError> {
    let lconfig = logger_config(&config)?;
    let file_logging_config = lconfig.file_logging_config.clone();
    init(lconfig)?;

    if let Some(file_config) = &file_logging_config {
        info!(
            log_dir = %file_config.directory.display(),
            log_prefix = %file_config.file_name_prefix,
            "file logging enabled"
        );
    }
    Ok(())
}
