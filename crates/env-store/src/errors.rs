use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvStoreError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed line {line} in environment record: {content:?}")]
    Malformed { line: usize, content: String },

    #[error("invalid key {0:?}")]
    InvalidKey(String),

    #[error("value for {0} contains a line break")]
    InvalidValue(String),

    #[error("environment record is missing keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

impl EnvStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
