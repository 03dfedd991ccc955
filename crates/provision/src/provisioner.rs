use provctl_env_store::EnvironmentStore;
use provctl_primitives::{Endpoint, ProviderId};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    account::{assign_roles, build_env_record, AccountRecord},
    artifact::AccountArtifact,
    errors::ProvisionError,
    source::AccountSource,
};

/// Turns generated keys into role accounts and persists them.
#[derive(Debug)]
pub struct AccountProvisioner {
    provider: ProviderId,
    endpoint: Endpoint,
}

impl AccountProvisioner {
    pub fn new(provider: ProviderId, endpoint: Endpoint) -> Self {
        Self { provider, endpoint }
    }

    /// Generates keys and assigns them to the roles. Persists nothing.
    pub async fn provision(
        &self,
        source: &dyn AccountSource,
        cancel: &CancellationToken,
    ) -> Result<Vec<AccountRecord>, ProvisionError> {
        let keys = source.generate(cancel).await?;
        let accounts = assign_roles(keys)?;
        for account in &accounts {
            info!(
                provider = %self.provider,
                role = %account.role,
                address = %account.address(),
                "assigned account"
            );
        }
        Ok(accounts)
    }

    /// Writes the artifact and then replaces the environment record.
    ///
    /// The record is built before anything touches disk and is swapped in
    /// last, so a failure leaves the previous record in place.
    pub fn persist(
        &self,
        accounts: &[AccountRecord],
        artifact: Option<&AccountArtifact>,
        store: &EnvironmentStore,
    ) -> Result<(), ProvisionError> {
        let record = build_env_record(self.provider, &self.endpoint, accounts)?;
        if let Some(artifact) = artifact {
            artifact.write(accounts)?;
        }
        store.save(&record)?;
        info!(provider = %self.provider, path = ?store.path(), "environment record written");
        Ok(())
    }
}
