use std::{fmt, path::PathBuf};

use provctl_primitives::ProviderId;
use provctl_workspace::{Selection, WorkspaceSelector};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    errors::{CleanupReport, ControlError},
    protocol::{InitReport, ProviderControl, ProviderStatus, StartReport, StopReport},
    registry::ProviderRegistry,
};

/// The four control verbs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verb {
    Init,
    Start,
    Stop,
    Kill,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Init => "init",
            Verb::Start => "start",
            Verb::Stop => "stop",
            Verb::Kill => "kill",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum VerbOutcome {
    Init(InitReport),
    Start(StartReport),
    Stop(StopReport),
    Kill(CleanupReport),
}

/// Resolves the target provider and forwards verbs to it.
#[derive(Debug)]
pub struct Dispatcher {
    selector: WorkspaceSelector,
    registry: ProviderRegistry,
}

impl Dispatcher {
    pub fn new(selector: WorkspaceSelector, registry: ProviderRegistry) -> Self {
        Self { selector, registry }
    }

    pub fn selector(&self) -> &WorkspaceSelector {
        &self.selector
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Parses a provider name and checks it is configured.
    pub fn resolve_name(&self, name: &str) -> Result<ProviderId, ControlError> {
        let id: ProviderId = name.parse()?;
        self.registry.get(id)?;
        Ok(id)
    }

    /// Creates the state directory of every configured provider.
    pub fn setup(&self) -> Result<Vec<PathBuf>, ControlError> {
        Ok(self.selector.setup(self.registry.ids())?)
    }

    /// Points the workspace at `id`.
    pub fn select(&self, id: ProviderId) -> Result<Selection, ControlError> {
        self.registry.get(id)?;
        let selection = self.selector.select(id)?;
        if let Selection::Changed { previous } = selection {
            info!(provider = %id, ?previous, "workspace switched");
        }
        Ok(selection)
    }

    pub fn current(&self) -> Result<Option<ProviderId>, ControlError> {
        Ok(self.selector.current()?)
    }

    /// The explicit provider after selecting it, or the active one.
    pub fn target(
        &self,
        explicit: Option<ProviderId>,
    ) -> Result<&dyn ProviderControl, ControlError> {
        let id = match explicit {
            Some(id) => {
                self.select(id)?;
                id
            }
            None => self.current()?.ok_or_else(|| {
                ControlError::Configuration(
                    "no provider selected; run `provctl select <provider>` or pass -p".to_owned(),
                )
            })?,
        };
        self.registry.get(id)
    }

    pub async fn run(
        &self,
        explicit: Option<ProviderId>,
        verb: Verb,
        cancel: &CancellationToken,
    ) -> Result<(ProviderId, VerbOutcome), ControlError> {
        let provider = self.target(explicit)?;
        let id = provider.id();
        info!(
            provider = %id,
            %verb,
            kind = %provider.kind(),
            endpoint = %provider.endpoint(),
            "running verb"
        );

        let outcome = match verb {
            Verb::Init => VerbOutcome::Init(provider.init(cancel).await?),
            Verb::Start => VerbOutcome::Start(provider.start(cancel).await?),
            Verb::Stop => VerbOutcome::Stop(provider.stop().await?),
            Verb::Kill => VerbOutcome::Kill(provider.kill().await),
        };
        Ok((id, outcome))
    }

    /// Status of every configured provider, with the active one flagged.
    pub async fn status(&self) -> Result<Vec<(ProviderStatus, bool)>, ControlError> {
        let current = self.current()?;
        let mut statuses = Vec::with_capacity(self.registry.len());
        for provider in self.registry.iter() {
            let status = provider.status().await?;
            let active = current == Some(status.id);
            statuses.push((status, active));
        }
        Ok(statuses)
    }
}
