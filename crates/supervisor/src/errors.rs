use std::{io, path::PathBuf, time::Duration};

use provctl_readiness::ProbeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("spawned {0} but it has no pid")]
    NoPid(String),

    #[error("{program} exited before becoming ready ({status})")]
    EarlyExit { program: String, status: String },

    #[error("{endpoint} already served by another process")]
    EndpointBusy { endpoint: String },

    #[error("{endpoint} not ready after {timeout:?}")]
    NotReady { endpoint: String, timeout: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("probe: {0}")]
    Probe(ProbeError),

    #[error("encoding process handle: {0}")]
    HandleEncode(#[source] serde_json::Error),

    #[error("signalling pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SupervisorError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

impl From<ProbeError> for SupervisorError {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::Cancelled => SupervisorError::Cancelled,
            other => SupervisorError::Probe(other),
        }
    }
}
