use std::{io, path::PathBuf};

use provctl_env_store::EnvStoreError;
use provctl_supervisor::SupervisorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("private key #{index} is invalid: {reason}")]
    InvalidKey { index: usize, reason: String },

    #[error("need {needed} accounts but only {found} were available")]
    NotEnoughAccounts { needed: usize, found: usize },

    #[error("throwaway node: {0}")]
    Node(#[from] SupervisorError),

    #[error("cancelled")]
    Cancelled,

    #[error("account artifact {path:?}: {source}")]
    ArtifactFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("environment record: {0}")]
    Env(#[from] EnvStoreError),

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProvisionError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ProvisionError::Cancelled | ProvisionError::Node(SupervisorError::Cancelled)
        )
    }
}
