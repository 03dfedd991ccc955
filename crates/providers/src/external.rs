//! Providers whose node is managed outside the controller.

use async_trait::async_trait;
use provctl_config::ExternalConfig;
use provctl_primitives::{Endpoint, ProviderId, ProviderKind};
use provctl_provision::{AccountProvisioner, StaticKeySource};
use provctl_readiness::{ProbeError, Readiness, ReadinessProber};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    errors::{CleanupReport, ControlError},
    paths::ProviderPaths,
    protocol::{
        require_provisioned, InitReport, ProviderControl, ProviderStatus, RunState, StartReport,
        StopReport,
    },
};

#[derive(Debug)]
pub struct ExternalProvider {
    id: ProviderId,
    config: ExternalConfig,
    paths: ProviderPaths,
    prober: ReadinessProber,
}

impl ExternalProvider {
    pub fn new(
        id: ProviderId,
        config: ExternalConfig,
        paths: ProviderPaths,
        prober: ReadinessProber,
    ) -> Self {
        Self {
            id,
            config,
            paths,
            prober,
        }
    }
}

#[async_trait]
impl ProviderControl for ExternalProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::External
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.config.host.clone(), self.config.port)
    }

    fn paths(&self) -> &ProviderPaths {
        &self.paths
    }

    async fn init(&self, cancel: &CancellationToken) -> Result<InitReport, ControlError> {
        if self.config.private_keys.is_empty() {
            return Err(ControlError::Provisioning(format!(
                "{} generates its own accounts; set providers.{}.private_keys",
                self.id, self.id
            )));
        }
        let provisioner = AccountProvisioner::new(self.id, self.endpoint());
        let source = StaticKeySource::new(self.config.private_keys.clone());
        let accounts = provisioner.provision(&source, cancel).await?;

        self.paths
            .remove_marker()
            .map_err(|e| ControlError::Internal(format!("failed to remove marker: {e}")))?;
        provisioner.persist(&accounts, Some(&self.paths.artifact()), &self.paths.env_store())?;
        Ok(InitReport::from_accounts(&accounts))
    }

    async fn start(&self, cancel: &CancellationToken) -> Result<StartReport, ControlError> {
        require_provisioned(&self.paths)?;
        let report = if self.config.probe {
            let endpoint = self.endpoint();
            match self.prober.wait_ready(&endpoint, cancel).await {
                Ok(Readiness::Ready { elapsed }) => {
                    info!(provider = %self.id, %endpoint, ?elapsed, "endpoint reachable");
                    StartReport::Reachable
                }
                Ok(Readiness::TimedOut { elapsed }) => {
                    return Err(ControlError::Startup(format!(
                        "{endpoint} not reachable after {elapsed:?}; is the node running?"
                    )));
                }
                Err(ProbeError::Cancelled) => return Err(ControlError::Cancelled),
                Err(e) => return Err(ControlError::Internal(e.to_string())),
            }
        } else {
            debug!(provider = %self.id, "no probe configured");
            StartReport::Unchecked
        };
        self.paths
            .write_marker()
            .map_err(|e| ControlError::Internal(format!("failed to write start marker: {e}")))?;
        Ok(report)
    }

    async fn stop(&self) -> Result<StopReport, ControlError> {
        Ok(StopReport::Unmanaged)
    }

    async fn kill(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        self.paths.discard(&mut report);
        report
    }

    async fn status(&self) -> Result<ProviderStatus, ControlError> {
        let state = if self.config.probe {
            let budget = self.prober.interval();
            if ReadinessProber::probe_once(&self.endpoint(), budget).await {
                RunState::Running
            } else {
                RunState::Stopped
            }
        } else {
            RunState::Unknown
        };
        Ok(ProviderStatus {
            id: self.id,
            kind: ProviderKind::External,
            endpoint: self.endpoint(),
            state,
            provisioned: require_provisioned(&self.paths).is_ok(),
            started_before: self.paths.has_marker(),
        })
    }
}
