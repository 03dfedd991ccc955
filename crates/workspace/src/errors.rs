use std::{io, path::PathBuf};

use provctl_primitives::ProviderId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("state directory for {provider} does not exist: {path:?} (run `provctl setup`)")]
    MissingProviderDir { provider: ProviderId, path: PathBuf },

    #[error("workspace pointer {path:?} is not a symlink")]
    NotASymlink { path: PathBuf },

    #[error("workspace pointer targets unknown provider {0:?}")]
    UnknownTarget(String),

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Whether the error stems from setup or user input rather than the host.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, WorkspaceError::Io { .. })
    }
}
