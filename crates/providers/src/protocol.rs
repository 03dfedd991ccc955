use std::fmt;

use alloy_primitives::Address;
use async_trait::async_trait;
use provctl_primitives::{env_keys, Endpoint, ProviderId, ProviderKind, Role};
use provctl_provision::AccountRecord;
use tokio_util::sync::CancellationToken;

use crate::{
    errors::{CleanupReport, ControlError},
    paths::ProviderPaths,
};

/// Accounts written by a successful `init`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitReport {
    pub accounts: Vec<(Role, Address)>,
}

impl InitReport {
    pub fn from_accounts(accounts: &[AccountRecord]) -> Self {
        Self {
            accounts: accounts.iter().map(|a| (a.role, a.address())).collect(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StartReport {
    /// A fresh node or container was brought up.
    Started { pid: Option<u32> },
    /// A stopped container was resumed.
    Resumed,
    AlreadyRunning { pid: Option<u32> },
    /// An externally managed endpoint answered.
    Reachable,
    /// Nothing to start or check.
    Unchecked,
}

impl fmt::Display for StartReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartReport::Started { pid: Some(pid) } => write!(f, "started (pid {pid})"),
            StartReport::Started { pid: None } => f.write_str("started"),
            StartReport::Resumed => f.write_str("resumed"),
            StartReport::AlreadyRunning { pid: Some(pid) } => {
                write!(f, "already running (pid {pid})")
            }
            StartReport::AlreadyRunning { pid: None } => f.write_str("already running"),
            StartReport::Reachable => f.write_str("endpoint reachable"),
            StartReport::Unchecked => f.write_str("nothing to start"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StopReport {
    Stopped,
    NotRunning,
    /// The recorded process was already gone.
    StaleHandle,
    /// The node is managed outside the controller.
    Unmanaged,
}

impl fmt::Display for StopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReport::Stopped => "stopped",
            StopReport::NotRunning => "not running",
            StopReport::StaleHandle => "not running (stale handle removed)",
            StopReport::Unmanaged => "not managed by provctl, nothing to stop",
        };
        f.write_str(s)
    }
}

/// Whether the provider's node is up, as far as the controller can tell.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunState {
    Running,
    Stopped,
    Unknown,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Running => "running",
            RunState::Stopped => "stopped",
            RunState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderStatus {
    pub id: ProviderId,
    pub kind: ProviderKind,
    pub endpoint: Endpoint,
    pub state: RunState,
    pub provisioned: bool,
    pub started_before: bool,
}

/// The uniform verb set every provider variant implements.
#[async_trait]
pub trait ProviderControl: Send + Sync + fmt::Debug {
    fn id(&self) -> ProviderId;

    fn kind(&self) -> ProviderKind;

    fn endpoint(&self) -> Endpoint;

    fn paths(&self) -> &ProviderPaths;

    /// Destroys and recreates provider data, leaving a full environment
    /// record behind.
    async fn init(&self, cancel: &CancellationToken) -> Result<InitReport, ControlError>;

    /// Brings the provider to a running, ready state.
    async fn start(&self, cancel: &CancellationToken) -> Result<StartReport, ControlError>;

    /// Suspends the provider, keeping its data.
    async fn stop(&self) -> Result<StopReport, ControlError>;

    /// Best-effort teardown of the node and all provider data.
    async fn kill(&self) -> CleanupReport;

    async fn status(&self) -> Result<ProviderStatus, ControlError>;
}

/// Fails unless `init` has written a complete record.
pub(crate) fn require_provisioned(paths: &ProviderPaths) -> Result<(), ControlError> {
    let store = paths.env_store();
    if !store.exists() {
        return Err(ControlError::Configuration(format!(
            "no environment record at {}; run `provctl init` first",
            store.path().display()
        )));
    }
    store.load()?.require(&env_keys::required_keys())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use provctl_env_store::EnvRecord;

    use super::*;

    #[test]
    fn test_require_provisioned() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProviderPaths::new(dir.path());
        assert!(matches!(
            require_provisioned(&paths),
            Err(ControlError::Configuration(_))
        ));

        let mut partial = EnvRecord::new();
        partial.insert(env_keys::PROVIDER_HOST, "127.0.0.1").unwrap();
        paths.env_store().save(&partial).unwrap();
        let err = require_provisioned(&paths).unwrap_err();
        assert!(matches!(err, ControlError::Configuration(ref m) if m.contains("PROVIDER_URL")));
    }
}
