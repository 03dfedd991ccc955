//! Configuration for the provider controller.
//!
//! The effective configuration is assembled in three layers: the built-in
//! provider table, an optional TOML file deep-merged on top, and finally
//! `path.to.key=value` overrides from the command line.

mod config;
mod defaults;
mod errors;
mod load;

pub use config::{
    Config, ContainerConfig, ExternalConfig, GeneralConfig, LocalNodeConfig, LoggingConfig,
    ProviderConfig,
};
pub use defaults::{DEV_MNEMONIC, GANACHE_DETERMINISTIC_KEYS};
pub use errors::ConfigError;
pub use load::{apply_override, load_config, parse_override};
