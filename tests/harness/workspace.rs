use std::io;

use provctl_config::{Config, ProviderConfig};
use provctl_primitives::ProviderId;
use provctl_providers::{Dispatcher, ProviderPaths, ProviderRegistry};
use provctl_workspace::WorkspaceSelector;
use tempfile::TempDir;

use super::FakeNode;

/// A controller over a throwaway base directory, removed on drop.
#[derive(Debug)]
pub struct TestWorkspace {
    _dir: TempDir,
    config: Config,
}

impl TestWorkspace {
    /// Default configuration with short timeouts and `ganache-local` backed
    /// by `node`.
    pub fn new(node: &FakeNode) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut config = Config::default();
        config.general.base_dir = dir.path().to_path_buf();
        config.general.readiness_timeout_secs = 5;
        config.general.poll_interval_ms = 50;
        config.general.stop_timeout_secs = 2;
        config.providers.insert(
            ProviderId::GanacheLocal.to_string(),
            ProviderConfig::Local(node.config()),
        );
        Ok(Self { _dir: dir, config })
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn selector(&self) -> WorkspaceSelector {
        WorkspaceSelector::new(
            self.config.general.providers_dir(),
            self.config.general.workspace_pointer(),
        )
    }

    pub fn paths(&self, id: ProviderId) -> ProviderPaths {
        ProviderPaths::new(self.selector().provider_dir(id))
    }

    /// A fresh dispatcher, as each CLI invocation would build one.
    pub fn dispatcher(&self) -> Dispatcher {
        let selector = self.selector();
        let registry = ProviderRegistry::from_config(&self.config, &selector)
            .unwrap_or_else(|e| panic!("registry: {e}"));
        Dispatcher::new(selector, registry)
    }
}
