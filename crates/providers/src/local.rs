//! Providers whose node is a process spawned on this machine.

use std::{fmt, path::MAIN_SEPARATOR, time::Duration};

use alloy_primitives::Address;
use async_trait::async_trait;
use provctl_config::LocalNodeConfig;
use provctl_primitives::{env_keys, Endpoint, ProviderId, ProviderKind, Role};
use provctl_provision::{AccountProvisioner, ThrowawayNodeSource};
use provctl_readiness::ReadinessProber;
use provctl_supervisor::{
    NodeCommand, NodeState, ProcessSupervisor, StartOutcome, StopOutcome, SupervisorError,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    errors::{CleanupReport, ControlError},
    paths::ProviderPaths,
    protocol::{
        require_provisioned, InitReport, ProviderControl, ProviderStatus, RunState, StartReport,
        StopReport,
    },
    template::{render_all, TemplateVars},
};

/// Scratch directory prefix for throwaway provisioning runs.
const PROVISION_PREFIX: &str = ".provision-";

/// Placeholder rendering to `<private key>,<balance in wei>` for a role,
/// the shape of ganache's `--wallet.accounts`.
fn account_placeholder(role: Role) -> &'static str {
    match role {
        Role::Alice => "alice_account",
        Role::Bob => "bob_account",
        Role::Carol => "carol_account",
    }
}

fn not_provisioned(what: impl fmt::Display) -> ControlError {
    ControlError::Configuration(format!("{what}; run `provctl init`"))
}

#[derive(Debug)]
pub struct LocalNodeProvider {
    id: ProviderId,
    config: LocalNodeConfig,
    paths: ProviderPaths,
    prober: ReadinessProber,
    supervisor: ProcessSupervisor,
}

impl LocalNodeProvider {
    pub fn new(
        id: ProviderId,
        config: LocalNodeConfig,
        paths: ProviderPaths,
        prober: ReadinessProber,
        stop_timeout: Duration,
    ) -> Self {
        let supervisor = ProcessSupervisor::new(paths.handle_file(), prober, stop_timeout);
        Self {
            id,
            config,
            paths,
            prober,
            supervisor,
        }
    }

    fn vars(&self, chain_dir: &str) -> TemplateVars {
        TemplateVars::new()
            .set("host", &self.config.host)
            .set("port", self.config.port)
            .set("network_id", self.config.network_id)
            .set("chain_dir", chain_dir)
            .set("accounts_file", self.paths.accounts().display())
            .set("mnemonic", &self.config.mnemonic)
            .set("account_count", Role::COUNT)
    }

    /// Adds the role account placeholders: each role's key from the
    /// environment record, funded with its balance from the account artifact.
    fn with_funded_accounts(&self, mut vars: TemplateVars) -> Result<TemplateVars, ControlError> {
        let artifact = self.paths.artifact();
        if !artifact.exists() {
            return Err(not_provisioned(format_args!(
                "no account artifact at {}",
                artifact.path().display()
            )));
        }
        let alloc = artifact.read()?;
        let record = self.paths.env_store().load()?;

        for role in Role::ALL {
            let lookup = |key: String| {
                record
                    .get(&key)
                    .ok_or_else(|| not_provisioned(format_args!("{key} missing from record")))
            };
            let key = lookup(env_keys::private_key_key(role))?;
            let raw_address = lookup(env_keys::address_key(role))?;
            let address: Address = raw_address.parse().map_err(|e| {
                ControlError::Configuration(format!("bad {role} address {raw_address}: {e}"))
            })?;
            let account = alloc.get(&address).ok_or_else(|| {
                not_provisioned(format_args!(
                    "{role} account {address} missing from {}",
                    artifact.path().display()
                ))
            })?;
            vars = vars.set(account_placeholder(role), format!("{key},{}", account.balance));
        }
        Ok(vars)
    }

    /// Command for a real start. First-start arguments, which fund the
    /// provisioned accounts, are added only while the marker is absent.
    fn start_command(&self) -> Result<NodeCommand, ControlError> {
        let chain_dir = self.paths.chain_dir();
        let vars = self.vars(&chain_dir.display().to_string());
        let mut args = render_all(&self.config.args, &vars)?;
        if !self.paths.has_marker() && !self.config.first_start_args.is_empty() {
            let vars = self.with_funded_accounts(vars)?;
            args.extend(render_all(&self.config.first_start_args, &vars)?);
        }
        Ok(NodeCommand::new(
            self.config.command.clone(),
            args,
            self.paths.node_log(),
        ))
    }

    /// Marker identifying this provider's nodes in process command lines.
    ///
    /// Both real and throwaway nodes get a data path under the state
    /// directory. The trailing separator keeps `ganache` from matching
    /// `ganache-local`.
    fn cmdline_marker(&self) -> String {
        format!("{}{MAIN_SEPARATOR}", self.paths.dir().display())
    }
}

#[async_trait]
impl ProviderControl for LocalNodeProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.config.host.clone(), self.config.port)
    }

    fn paths(&self) -> &ProviderPaths {
        &self.paths
    }

    async fn init(&self, cancel: &CancellationToken) -> Result<InitReport, ControlError> {
        // The throwaway node needs the same port.
        match self.supervisor.stop().await? {
            StopOutcome::Stopped { pid, .. } => info!(provider = %self.id, pid, "stopped node"),
            StopOutcome::NotRunning | StopOutcome::StaleHandle { .. } => {}
        }

        let scratch = tempfile::Builder::new()
            .prefix(PROVISION_PREFIX)
            .tempdir_in(self.paths.dir())
            .map_err(|e| {
                ControlError::Internal(format!(
                    "failed to create scratch dir in {}: {e}",
                    self.paths.dir().display()
                ))
            })?;
        let scratch_chain = scratch.path().join("chaindata");
        let vars = self.vars(&scratch_chain.display().to_string());
        let command = NodeCommand::new(
            self.config.command.clone(),
            render_all(&self.config.provision_args, &vars)?,
            scratch.path().join("provision.log"),
        );

        let provisioner = AccountProvisioner::new(self.id, self.endpoint());
        let source = ThrowawayNodeSource::new(command, self.endpoint(), self.prober);
        let accounts = provisioner.provision(&source, cancel).await?;

        // Old chain state belongs to the old accounts.
        self.paths.remove_chain_dir().map_err(|e| {
            ControlError::Internal(format!(
                "failed to remove {}: {e}",
                self.paths.chain_dir().display()
            ))
        })?;
        self.paths
            .remove_marker()
            .map_err(|e| ControlError::Internal(format!("failed to remove marker: {e}")))?;
        provisioner.persist(&accounts, Some(&self.paths.artifact()), &self.paths.env_store())?;

        Ok(InitReport::from_accounts(&accounts))
    }

    async fn start(&self, cancel: &CancellationToken) -> Result<StartReport, ControlError> {
        require_provisioned(&self.paths)?;
        let command = self.start_command()?;
        let outcome = self
            .supervisor
            .start(&command, &self.endpoint(), cancel)
            .await
            .map_err(ControlError::startup)?;

        match outcome {
            StartOutcome::AlreadyRunning { pid } => {
                Ok(StartReport::AlreadyRunning { pid: Some(pid) })
            }
            StartOutcome::Started { pid, .. } => {
                self.paths.write_marker().map_err(|e| {
                    ControlError::Internal(format!("failed to write start marker: {e}"))
                })?;
                Ok(StartReport::Started { pid: Some(pid) })
            }
        }
    }

    async fn stop(&self) -> Result<StopReport, ControlError> {
        Ok(match self.supervisor.stop().await? {
            StopOutcome::Stopped { .. } => StopReport::Stopped,
            StopOutcome::NotRunning => StopReport::NotRunning,
            StopOutcome::StaleHandle { .. } => StopReport::StaleHandle,
        })
    }

    async fn kill(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        match self.supervisor.stop().await {
            Ok(StopOutcome::Stopped { .. }) => report.removed("node process"),
            Ok(StopOutcome::NotRunning) => report.warn("node process", "no node was running"),
            Ok(StopOutcome::StaleHandle { pid }) => {
                report.warn("node process", format!("handle named dead pid {pid}"))
            }
            Err(e) => report.fail("node process", e.to_string()),
        }

        let orphans = self.supervisor.kill_orphans(&self.cmdline_marker());
        if !orphans.is_empty() {
            warn!(provider = %self.id, ?orphans, "killed orphaned nodes");
            report.removed(format!("{} orphaned node(s)", orphans.len()));
        }

        self.paths.discard(&mut report);
        report
    }

    async fn status(&self) -> Result<ProviderStatus, ControlError> {
        let state = match self.supervisor.state() {
            Ok(NodeState::Running) => RunState::Running,
            Ok(_) => RunState::Stopped,
            Err(SupervisorError::Io { .. }) => RunState::Unknown,
            Err(e) => return Err(e.into()),
        };
        Ok(ProviderStatus {
            id: self.id,
            kind: ProviderKind::Local,
            endpoint: self.endpoint(),
            state,
            provisioned: require_provisioned(&self.paths).is_ok(),
            started_before: self.paths.has_marker(),
        })
    }
}
