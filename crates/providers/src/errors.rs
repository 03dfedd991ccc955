use std::fmt;

use provctl_config::ConfigError;
use provctl_env_store::EnvStoreError;
use provctl_primitives::PrimitivesError;
use provctl_provision::ProvisionError;
use provctl_supervisor::SupervisorError;
use provctl_workspace::WorkspaceError;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of a control verb, classified by the recovery it calls for.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Setup or input problem. Nothing was mutated.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Account generation failed. The previous record is untouched.
    #[error("provisioning error: {0}")]
    Provisioning(String),

    /// The node did not come up. No handle was persisted.
    #[error("startup error: {0}")]
    Startup(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Process exit status for this class of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            ControlError::Configuration(_) => 2,
            ControlError::Provisioning(_) => 3,
            ControlError::Startup(_) => 4,
            ControlError::Cancelled => 130,
            ControlError::Internal(_) => 1,
        }
    }

    /// Classifies a supervisor failure that happened while starting a node.
    pub fn startup(e: SupervisorError) -> Self {
        match e {
            SupervisorError::Cancelled => ControlError::Cancelled,
            SupervisorError::Io { .. } | SupervisorError::HandleEncode(_) => {
                ControlError::Internal(e.to_string())
            }
            other => ControlError::Startup(other.to_string()),
        }
    }
}

impl From<ConfigError> for ControlError {
    fn from(e: ConfigError) -> Self {
        ControlError::Configuration(e.to_string())
    }
}

impl From<PrimitivesError> for ControlError {
    fn from(e: PrimitivesError) -> Self {
        ControlError::Configuration(e.to_string())
    }
}

impl From<WorkspaceError> for ControlError {
    fn from(e: WorkspaceError) -> Self {
        if e.is_configuration() {
            ControlError::Configuration(e.to_string())
        } else {
            ControlError::Internal(e.to_string())
        }
    }
}

impl From<EnvStoreError> for ControlError {
    fn from(e: EnvStoreError) -> Self {
        match e {
            EnvStoreError::MissingKeys(_) | EnvStoreError::Malformed { .. } => {
                ControlError::Configuration(format!("{e} (run `provctl init`)"))
            }
            other => ControlError::Internal(other.to_string()),
        }
    }
}

impl From<ProvisionError> for ControlError {
    fn from(e: ProvisionError) -> Self {
        if e.is_cancelled() {
            return ControlError::Cancelled;
        }
        match e {
            ProvisionError::Io { .. }
            | ProvisionError::ArtifactFormat { .. }
            | ProvisionError::Env(_) => ControlError::Internal(e.to_string()),
            other => ControlError::Provisioning(other.to_string()),
        }
    }
}

/// Supervisor failures outside of `start` (stopping, inspecting handles).
impl From<SupervisorError> for ControlError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::Cancelled => ControlError::Cancelled,
            other => ControlError::Internal(other.to_string()),
        }
    }
}

/// Whether a teardown step merely had nothing to do or actually failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WarningKind {
    /// Nothing to remove. Expected after a partial setup.
    Advisory,
    /// Something was there and could not be removed.
    Failed,
}

/// A teardown step that found nothing to do or failed without stopping the
/// remaining steps.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CleanupWarning {
    pub step: &'static str,
    pub kind: WarningKind,
    pub message: String,
}

impl CleanupWarning {
    pub fn is_failure(&self) -> bool {
        self.kind == WarningKind::Failed
    }
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// Outcome of `kill`. Never an error; callers decide what failed steps mean.
#[derive(Clone, Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<String>,
    pub warnings: Vec<CleanupWarning>,
}

impl CleanupReport {
    pub fn removed(&mut self, what: impl Into<String>) {
        self.removed.push(what.into());
    }

    /// Records a step that had nothing to do.
    pub fn warn(&mut self, step: &'static str, message: impl Into<String>) {
        let message = message.into();
        debug!(step, %message, "nothing to clean up");
        self.warnings.push(CleanupWarning {
            step,
            kind: WarningKind::Advisory,
            message,
        });
    }

    /// Records a step that left something behind.
    pub fn fail(&mut self, step: &'static str, message: impl Into<String>) {
        let message = message.into();
        warn!(step, %message, "cleanup step failed");
        self.warnings.push(CleanupWarning {
            step,
            kind: WarningKind::Failed,
            message,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        self.warnings.iter().any(CleanupWarning::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CleanupWarning> {
        self.warnings.iter().filter(|w| w.is_failure())
    }
}
