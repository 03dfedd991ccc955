//! Logging subsystem built on `tracing-subscriber`.

pub mod manager;
pub mod service;
pub mod types;


pub use manager::{build_filter, init, LoggingError};
pub use service::{init_logging_from_config, logger_config, parse_level, LoggingInitConfig};
pub use types::{FileLoggingConfig, LoggerConfig, StderrConfig};

// Re-export tracing-appender types for convenience
pub use tracing_appender::rolling::Rotation;
