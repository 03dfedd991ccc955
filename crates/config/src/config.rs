use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use provctl_primitives::{Endpoint, ProviderId, ProviderKind};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default value for `base_dir` in [`GeneralConfig`].
const DEFAULT_BASE_DIR: &str = ".provctl";

/// Default value for `readiness_timeout_secs` in [`GeneralConfig`].
const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 30;

/// Default value for `poll_interval_ms` in [`GeneralConfig`].
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default value for `stop_timeout_secs` in [`GeneralConfig`].
const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

/// Name of the workspace pointer inside `base_dir`.
const WORKSPACE_POINTER: &str = "workspace";

/// Directory holding the per-provider state directories inside `base_dir`.
const PROVIDERS_DIR: &str = "providers";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Root of all controller state.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// How long `start` and provisioning wait for a node to accept connections.
    #[serde(default = "default_readiness_timeout_secs")]
    pub readiness_timeout_secs: u64,

    /// Interval between readiness and liveness polls in ms.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Grace period between TERM and KILL when stopping a node.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_base_dir() -> PathBuf {
    DEFAULT_BASE_DIR.into()
}

fn default_readiness_timeout_secs() -> u64 {
    DEFAULT_READINESS_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_stop_timeout_secs() -> u64 {
    DEFAULT_STOP_TIMEOUT_SECS
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            readiness_timeout_secs: DEFAULT_READINESS_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS,
        }
    }
}

impl GeneralConfig {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Directory containing one state directory per provider.
    pub fn providers_dir(&self) -> PathBuf {
        self.base_dir.join(PROVIDERS_DIR)
    }

    /// Path of the symlink naming the active provider.
    pub fn workspace_pointer(&self) -> PathBuf {
        self.base_dir.join(WORKSPACE_POINTER)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format for logs instead of compact format.
    #[serde(default)]
    pub json_format: bool,

    /// Directory path for file-based logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Prefix for log file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_prefix: Option<String>,
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            log_dir: None,
            log_file_prefix: None,
        }
    }
}

/// A node process spawned and supervised on this machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalNodeConfig {
    pub host: String,
    pub port: u16,
    pub network_id: u64,

    /// Executable to spawn.
    pub command: String,

    /// Fixed phrase the node derives its accounts from.
    pub mnemonic: String,

    /// Arguments for every real start.
    #[serde(default)]
    pub args: Vec<String>,

    /// Arguments for the throwaway node run during provisioning.
    #[serde(default)]
    pub provision_args: Vec<String>,

    /// Extra arguments for the first start after provisioning only. May use
    /// `{alice_account}`, `{bob_account}` and `{carol_account}`, each
    /// rendering `<private key>,<balance in wei>`.
    #[serde(default)]
    pub first_start_args: Vec<String>,
}

/// A node running inside a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub host: String,
    pub port: u16,
    pub image: String,

    /// Port the node listens on inside the container.
    pub container_port: u16,

    /// Container runtime CLI.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Container name, defaults to `provctl-<provider>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,

    /// Mount point of the provider's chain directory inside the container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_mount: Option<String>,

    /// Arguments passed to the image entrypoint.
    #[serde(default)]
    pub args: Vec<String>,

    /// Pre-funded keys of the network, assigned to roles in order.
    #[serde(default)]
    pub private_keys: Vec<String>,
}

fn default_runtime() -> String {
    "docker".to_owned()
}

/// A node managed outside the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    pub host: String,
    pub port: u16,

    /// Whether `start` should wait for the endpoint to accept connections.
    #[serde(default = "default_probe")]
    pub probe: bool,

    /// Pre-funded keys of the network, assigned to roles in order.
    #[serde(default)]
    pub private_keys: Vec<String>,
}

fn default_probe() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Local(LocalNodeConfig),
    Container(ContainerConfig),
    External(ExternalConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Local(_) => ProviderKind::Local,
            ProviderConfig::Container(_) => ProviderKind::Container,
            ProviderConfig::External(_) => ProviderKind::External,
        }
    }

    /// Endpoint clients reach the provider on.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ProviderConfig::Local(c) => Endpoint::new(c.host.clone(), c.port),
            ProviderConfig::Container(c) => Endpoint::new(c.host.clone(), c.port),
            ProviderConfig::External(c) => Endpoint::new(c.host.clone(), c.port),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Logging configuration (optional section in TOML).
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Provider table keyed by provider name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Config {
    pub fn provider(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Configured providers, in the fixed listing order.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.providers.contains_key(id.as_str()))
            .collect()
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.providers.keys() {
            name.parse::<ProviderId>()
                .map_err(|_| ConfigError::UnknownProvider(name.clone()))?;
        }
        if self.general.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "general.poll_interval_ms must be positive".to_owned(),
            ));
        }
        if self.general.readiness_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "general.readiness_timeout_secs must be positive".to_owned(),
            ));
        }
        for (name, provider) in &self.providers {
            if let ProviderConfig::Local(local) = provider {
                if local.command.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "providers.{name}.command must not be empty"
                    )));
                }
            }
        }
        Ok(())
    }
}
