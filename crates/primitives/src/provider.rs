//! Provider identifiers and the kinds of backend they are driven as.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::PrimitivesError;

/// One of the selectable backend networks.
///
/// The set is closed: every variant has a private state directory and a
/// control implementation, and nothing else can be selected.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    Besu,
    Ganache,
    GanacheLocal,
    GanacheGui,
    Pricom,
    Tester,
}

impl ProviderId {
    /// All variants, in the order they are listed to the user.
    pub const ALL: [ProviderId; 6] = [
        ProviderId::Besu,
        ProviderId::Ganache,
        ProviderId::GanacheLocal,
        ProviderId::GanacheGui,
        ProviderId::Pricom,
        ProviderId::Tester,
    ];

    /// Name used on the command line, in config tables and as the state
    /// directory name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Besu => "besu",
            ProviderId::Ganache => "ganache",
            ProviderId::GanacheLocal => "ganache-local",
            ProviderId::GanacheGui => "ganache-gui",
            ProviderId::Pricom => "pricom",
            ProviderId::Tester => "tester",
        }
    }

    /// How the provider is driven when nothing else is configured.
    pub const fn default_kind(&self) -> ProviderKind {
        match self {
            ProviderId::GanacheLocal => ProviderKind::Local,
            ProviderId::Besu | ProviderId::Ganache => ProviderKind::Container,
            ProviderId::GanacheGui | ProviderId::Pricom | ProviderId::Tester => {
                ProviderKind::External
            }
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| PrimitivesError::UnknownProvider(s.to_owned()))
    }
}

/// The way a provider's node is brought up and torn down.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// A node process spawned and supervised on this machine.
    Local,
    /// A node running inside a docker container.
    Container,
    /// A node managed outside the controller (a desktop app or a remote network).
    External,
}

impl ProviderKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Container => "container",
            ProviderKind::External => "external",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(ProviderKind::Local),
            "container" => Ok(ProviderKind::Container),
            "external" => Ok(ProviderKind::External),
            other => Err(PrimitivesError::UnknownProviderKind(other.to_owned())),
        }
    }
}
