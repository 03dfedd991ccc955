use std::{collections::BTreeMap, sync::Arc};

use provctl_config::{Config, ProviderConfig};
use provctl_primitives::ProviderId;
use provctl_readiness::ReadinessProber;
use provctl_workspace::WorkspaceSelector;

use crate::{
    container::{ContainerProvider, DockerCli},
    errors::ControlError,
    external::ExternalProvider,
    local::LocalNodeProvider,
    paths::ProviderPaths,
    protocol::ProviderControl,
};

/// Lookup table from provider id to its control implementation.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderId, Box<dyn ProviderControl>>,
}

impl ProviderRegistry {
    /// Builds one implementation per configured provider.
    pub fn from_config(
        config: &Config,
        selector: &WorkspaceSelector,
    ) -> Result<Self, ControlError> {
        let general = &config.general;
        let prober = ReadinessProber::new(general.poll_interval(), general.readiness_timeout())
            .map_err(|e| ControlError::Configuration(e.to_string()))?;

        let mut registry = Self::default();
        for id in config.provider_ids() {
            let Some(provider) = config.provider(id) else {
                continue;
            };
            let paths = ProviderPaths::new(selector.provider_dir(id));
            let control: Box<dyn ProviderControl> = match provider {
                ProviderConfig::Local(c) => Box::new(LocalNodeProvider::new(
                    id,
                    c.clone(),
                    paths,
                    prober,
                    general.stop_timeout(),
                )),
                ProviderConfig::Container(c) => Box::new(ContainerProvider::new(
                    id,
                    c.clone(),
                    paths,
                    prober,
                    Arc::new(DockerCli::new(c.runtime.clone())),
                )),
                ProviderConfig::External(c) => Box::new(ExternalProvider::new(
                    id,
                    c.clone(),
                    paths,
                    prober,
                )),
            };
            registry.insert(control);
        }
        Ok(registry)
    }

    /// Adds or replaces the implementation for its provider.
    pub fn insert(&mut self, provider: Box<dyn ProviderControl>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn get(&self, id: ProviderId) -> Result<&dyn ProviderControl, ControlError> {
        self.providers
            .get(&id)
            .map(AsRef::as_ref)
            .ok_or_else(|| ControlError::Configuration(format!("provider {id} is not configured")))
    }

    pub fn ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.providers.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ProviderControl> {
        self.providers.values().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use provctl_primitives::ProviderKind;

    use super::*;

    #[test]
    fn test_from_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let selector = WorkspaceSelector::new(dir.path().join("providers"), dir.path().join("ws"));
        let registry = ProviderRegistry::from_config(&Config::default(), &selector).unwrap();

        assert_eq!(registry.len(), ProviderId::ALL.len());
        for id in ProviderId::ALL {
            let provider = registry.get(id).unwrap();
            assert_eq!(provider.id(), id);
            assert_eq!(provider.kind(), id.default_kind());
            assert_eq!(provider.paths().dir(), selector.provider_dir(id));
        }
        assert_eq!(
            registry.get(ProviderId::GanacheLocal).unwrap().kind(),
            ProviderKind::Local
        );
    }

    #[test]
    fn test_unconfigured_provider() {
        let dir = tempfile::tempdir().unwrap();
        let selector = WorkspaceSelector::new(dir.path().join("providers"), dir.path().join("ws"));
        let mut config = Config::default();
        config.providers.remove("pricom");
        let registry = ProviderRegistry::from_config(&config, &selector).unwrap();
        assert!(matches!(
            registry.get(ProviderId::Pricom),
            Err(ControlError::Configuration(_))
        ));
        assert!(registry.ids().all(|id| id != ProviderId::Pricom));
    }
}
