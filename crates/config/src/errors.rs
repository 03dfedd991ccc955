use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing toml: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("serializing defaults: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Missing key in table.
    #[error("missing key: {key} (at '{path}')")]
    MissingKey { key: String, path: String },

    /// Tried to traverse into a primitive.
    #[error("can't traverse into non-table key: {key} (at '{path}')")]
    TraverseNonTableAt { key: String, path: String },

    /// Invalid override string.
    #[error("invalid override: '{0}'")]
    InvalidOverride(String),

    #[error("unknown provider in config: {0}")]
    UnknownProvider(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
