//! Providers whose node runs inside a container.

use std::{fmt, fs, io, net::IpAddr, process::Stdio, sync::Arc};

use async_trait::async_trait;
use provctl_config::ContainerConfig;
use provctl_primitives::{Endpoint, ProviderId, ProviderKind};
use provctl_provision::{AccountProvisioner, StaticKeySource};
use provctl_readiness::{ProbeError, Readiness, ReadinessProber};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::{CleanupReport, ControlError},
    paths::ProviderPaths,
    protocol::{
        require_provisioned, InitReport, ProviderControl, ProviderStatus, RunState, StartReport,
        StopReport,
    },
    template::{render_all, TemplateVars},
};

/// Captured result of one runtime CLI call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

/// A container runtime driven through its command line.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + fmt::Debug {
    async fn exec(&self, args: Vec<String>) -> io::Result<CommandOutput>;
}

/// Runs the `docker` (or compatible) CLI.
#[derive(Clone, Debug)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn exec(&self, args: Vec<String>) -> io::Result<CommandOutput> {
        debug!(program = %self.program, ?args, "running container runtime");
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await?;
        let status_code = output
            .status
            .code()
            .unwrap_or(if output.status.success() { 0 } else { 1 });
        Ok(CommandOutput {
            status_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ContainerState {
    Missing,
    Stopped,
    Running,
}

#[derive(Debug)]
pub struct ContainerProvider {
    id: ProviderId,
    config: ContainerConfig,
    paths: ProviderPaths,
    prober: ReadinessProber,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerProvider {
    pub fn new(
        id: ProviderId,
        config: ContainerConfig,
        paths: ProviderPaths,
        prober: ReadinessProber,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            id,
            config,
            paths,
            prober,
            runtime,
        }
    }

    pub fn container_name(&self) -> String {
        self.config
            .container_name
            .clone()
            .unwrap_or_else(|| format!("provctl-{}", self.id))
    }

    async fn exec(&self, args: &[&str]) -> Result<CommandOutput, ControlError> {
        let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        self.exec_owned(args).await
    }

    async fn exec_owned(&self, args: Vec<String>) -> Result<CommandOutput, ControlError> {
        let verb = args.first().cloned().unwrap_or_default();
        self.runtime.exec(args).await.map_err(|e| {
            ControlError::Configuration(format!(
                "failed to run container runtime `{}` ({verb}): {e}",
                self.config.runtime
            ))
        })
    }

    /// Runs a command that must succeed, mapping failure to `on_failure`.
    async fn exec_checked(
        &self,
        args: Vec<String>,
        on_failure: fn(String) -> ControlError,
    ) -> Result<CommandOutput, ControlError> {
        let rendered = args.join(" ");
        let output = self.exec_owned(args).await?;
        if !output.success() {
            return Err(on_failure(format!(
                "`{} {rendered}` exited with {}: {}",
                self.config.runtime,
                output.status_code,
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    async fn state(&self) -> Result<ContainerState, ControlError> {
        let name = self.container_name();
        let output = self
            .exec(&["inspect", "-f", "{{.State.Running}}", &name])
            .await?;
        if !output.success() {
            return Ok(ContainerState::Missing);
        }
        Ok(match output.stdout.trim() {
            "true" => ContainerState::Running,
            _ => ContainerState::Stopped,
        })
    }

    /// `host:port:container_port`, or `port:container_port` when the host is
    /// a name the runtime cannot bind to.
    fn publish_spec(&self) -> String {
        let c = &self.config;
        if c.host.parse::<IpAddr>().is_ok() {
            format!("{}:{}:{}", c.host, c.port, c.container_port)
        } else {
            format!("{}:{}", c.port, c.container_port)
        }
    }

    fn run_args(&self) -> Result<Vec<String>, ControlError> {
        let c = &self.config;
        let vars = TemplateVars::new()
            .set("host", &c.host)
            .set("port", c.port)
            .set("container_port", c.container_port)
            .set("data_mount", c.data_mount.as_deref().unwrap_or_default());

        let mut args = vec![
            "run".to_owned(),
            "-d".to_owned(),
            "--name".to_owned(),
            self.container_name(),
            "-p".to_owned(),
            self.publish_spec(),
        ];
        if let Some(mount) = &c.data_mount {
            args.push("-v".to_owned());
            args.push(format!("{}:{mount}", self.paths.chain_dir().display()));
        }
        args.push(c.image.clone());
        args.extend(render_all(&c.args, &vars)?);
        Ok(args)
    }

    async fn remove_container(&self) -> Result<bool, ControlError> {
        let name = self.container_name();
        let output = self.exec(&["rm", "-f", &name]).await?;
        Ok(output.success())
    }

    async fn cold_start(&self) -> Result<(), ControlError> {
        if self.config.data_mount.is_some() {
            let chain_dir = self.paths.chain_dir();
            fs::create_dir_all(&chain_dir).map_err(|e| {
                ControlError::Internal(format!("failed to create {}: {e}", chain_dir.display()))
            })?;
        }
        info!(provider = %self.id, image = %self.config.image, "creating container");
        self.exec_checked(self.run_args()?, ControlError::Startup)
            .await?;
        Ok(())
    }

    /// Waits for the endpoint; on failure the container is stopped again.
    async fn await_ready(&self, cancel: &CancellationToken) -> Result<(), ControlError> {
        let endpoint = self.endpoint();
        let failure = match self.prober.wait_ready(&endpoint, cancel).await {
            Ok(Readiness::Ready { elapsed }) => {
                info!(provider = %self.id, %endpoint, ?elapsed, "container ready");
                return Ok(());
            }
            Ok(Readiness::TimedOut { elapsed }) => ControlError::Startup(format!(
                "{endpoint} not ready after {elapsed:?}"
            )),
            Err(ProbeError::Cancelled) => ControlError::Cancelled,
            Err(e) => ControlError::Internal(e.to_string()),
        };
        let name = self.container_name();
        if let Err(e) = self.exec(&["stop", &name]).await {
            warn!(provider = %self.id, %e, "failed to stop container after failed start");
        }
        Err(failure)
    }
}

#[async_trait]
impl ProviderControl for ContainerProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Container
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.config.host.clone(), self.config.port)
    }

    fn paths(&self) -> &ProviderPaths {
        &self.paths
    }

    async fn init(&self, cancel: &CancellationToken) -> Result<InitReport, ControlError> {
        let provisioner = AccountProvisioner::new(self.id, self.endpoint());
        let source = StaticKeySource::new(self.config.private_keys.clone());
        let accounts = provisioner.provision(&source, cancel).await?;

        if self.remove_container().await? {
            info!(provider = %self.id, name = %self.container_name(), "removed old container");
        }
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
        let name = self.container_name();

        let report = match self.state().await? {
            ContainerState::Running => {
                info!(provider = %self.id, %name, "container already running");
                return Ok(StartReport::AlreadyRunning { pid: None });
            }
            ContainerState::Stopped if self.paths.has_marker() => {
                info!(provider = %self.id, %name, "resuming container");
                self.exec_checked(vec!["start".to_owned(), name], ControlError::Startup)
                    .await?;
                StartReport::Resumed
            }
            ContainerState::Stopped => {
                // Left over from before the last init.
                self.remove_container().await?;
                self.cold_start().await?;
                StartReport::Started { pid: None }
            }
            ContainerState::Missing => {
                self.cold_start().await?;
                StartReport::Started { pid: None }
            }
        };

        self.await_ready(cancel).await?;
        self.paths
            .write_marker()
            .map_err(|e| ControlError::Internal(format!("failed to write start marker: {e}")))?;
        Ok(report)
    }

    async fn stop(&self) -> Result<StopReport, ControlError> {
        if self.state().await? != ContainerState::Running {
            return Ok(StopReport::NotRunning);
        }
        let name = self.container_name();
        self.exec_checked(vec!["stop".to_owned(), name], ControlError::Internal)
            .await?;
        info!(provider = %self.id, "container stopped");
        Ok(StopReport::Stopped)
    }

    async fn kill(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        match self.remove_container().await {
            Ok(true) => report.removed("container"),
            Ok(false) => report.warn("container", "no container to remove"),
            Err(e) => report.fail("container", e.to_string()),
        }
        self.paths.discard(&mut report);
        report
    }

    async fn status(&self) -> Result<ProviderStatus, ControlError> {
        let state = match self.state().await {
            Ok(ContainerState::Running) => RunState::Running,
            Ok(_) => RunState::Stopped,
            Err(e) => {
                debug!(provider = %self.id, %e, "container state unavailable");
                RunState::Unknown
            }
        };
        Ok(ProviderStatus {
            id: self.id,
            kind: ProviderKind::Container,
            endpoint: self.endpoint(),
            state,
            provisioned: require_provisioned(&self.paths).is_ok(),
            started_before: self.paths.has_marker(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use provctl_config::GANACHE_DETERMINISTIC_KEYS;
    use provctl_primitives::env_keys;
    use tokio::net::TcpListener;

    use super::*;

    /// Records calls and answers `inspect` from a scripted container state.
    #[derive(Debug)]
    struct FakeRuntime {
        calls: Mutex<Vec<Vec<String>>>,
        state: Mutex<ContainerState>,
    }

    impl FakeRuntime {
        fn new(state: ContainerState) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                state: Mutex::new(state),
            })
        }

        fn verbs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c[0].clone())
                .collect()
        }

        fn last(&self, verb: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|c| c[0] == verb)
                .cloned()
                .unwrap()
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn exec(&self, args: Vec<String>) -> io::Result<CommandOutput> {
            self.calls.lock().unwrap().push(args.clone());
            let mut state = self.state.lock().unwrap();
            let ok = CommandOutput::default();
            let missing = CommandOutput {
                status_code: 1,
                stderr: "No such container".to_owned(),
                ..Default::default()
            };
            Ok(match args[0].as_str() {
                "inspect" => match *state {
                    ContainerState::Missing => missing,
                    ContainerState::Stopped => CommandOutput {
                        stdout: "false\n".to_owned(),
                        ..ok
                    },
                    ContainerState::Running => CommandOutput {
                        stdout: "true\n".to_owned(),
                        ..ok
                    },
                },
                "run" | "start" => {
                    *state = ContainerState::Running;
                    ok
                }
                "stop" => {
                    if *state == ContainerState::Running {
                        *state = ContainerState::Stopped;
                    }
                    ok
                }
                "rm" => {
                    let existed = *state != ContainerState::Missing;
                    *state = ContainerState::Missing;
                    if existed {
                        ok
                    } else {
                        missing
                    }
                }
                _ => missing,
            })
        }
    }

    fn config(port: u16) -> ContainerConfig {
        ContainerConfig {
            host: "127.0.0.1".to_owned(),
            port,
            image: "example/node:latest".to_owned(),
            container_port: 8545,
            runtime: "docker".to_owned(),
            container_name: None,
            data_mount: Some("/data".to_owned()),
            args: vec!["--port".to_owned(), "{container_port}".to_owned()],
            private_keys: GANACHE_DETERMINISTIC_KEYS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
        }
    }

    fn provider(
        dir: &tempfile::TempDir,
        port: u16,
        runtime: Arc<FakeRuntime>,
    ) -> ContainerProvider {
        let prober =
            ReadinessProber::new(Duration::from_millis(20), Duration::from_millis(300)).unwrap();
        ContainerProvider::new(
            ProviderId::Ganache,
            config(port),
            ProviderPaths::new(dir.path()),
            prober,
            runtime,
        )
    }

    #[test]
    fn test_run_args() {
        let dir = tempfile::tempdir().unwrap();
        let provider = provider(&dir, 8546, FakeRuntime::new(ContainerState::Missing));
        let args = provider.run_args().unwrap();
        let mount = format!("{}:/data", dir.path().join("chaindata").display());
        assert_eq!(
            args,
            vec![
                "run",
                "-d",
                "--name",
                "provctl-ganache",
                "-p",
                "127.0.0.1:8546:8545",
                "-v",
                mount.as_str(),
                "example/node:latest",
                "--port",
                "8545",
            ]
        );
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let dir = tempfile::tempdir().unwrap();
        let runtime = FakeRuntime::new(ContainerState::Missing);
        let provider = provider(&dir, port, runtime.clone());
        let cancel = CancellationToken::new();

        let report = provider.init(&cancel).await.unwrap();
        assert_eq!(report.accounts.len(), 3);
        let record = provider.paths().env_store().load().unwrap();
        record.require(&env_keys::required_keys()).unwrap();

        assert_eq!(
            provider.start(&cancel).await.unwrap(),
            StartReport::Started { pid: None }
        );
        assert!(provider.paths().has_marker());
        assert_eq!(
            provider.start(&cancel).await.unwrap(),
            StartReport::AlreadyRunning { pid: None }
        );
        assert_eq!(provider.stop().await.unwrap(), StopReport::Stopped);
        assert_eq!(provider.stop().await.unwrap(), StopReport::NotRunning);
        assert_eq!(provider.start(&cancel).await.unwrap(), StartReport::Resumed);
        assert_eq!(runtime.last("start"), vec!["start", "provctl-ganache"]);

        let cleanup = provider.kill().await;
        assert!(cleanup.removed.iter().any(|r| r == "container"));
        assert!(!provider.paths().environment().exists());
        assert_eq!(
            runtime.verbs().iter().filter(|v| *v == "run").count(),
            1,
            "a resumed container must not be recreated"
        );
    }

    #[tokio::test]
    async fn test_start_timeout_stops_container() {
        // Bind and drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let dir = tempfile::tempdir().unwrap();
        let runtime = FakeRuntime::new(ContainerState::Missing);
        let provider = provider(&dir, port, runtime.clone());
        let cancel = CancellationToken::new();
        provider.init(&cancel).await.unwrap();

        let err = provider.start(&cancel).await.unwrap_err();
        assert!(matches!(err, ControlError::Startup(_)));
        assert!(!provider.paths().has_marker());
        assert_eq!(runtime.verbs().last().map(String::as_str), Some("stop"));
    }

    #[tokio::test]
    async fn test_init_rejects_short_key_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(8545);
        config.private_keys.truncate(2);
        let prober =
            ReadinessProber::new(Duration::from_millis(20), Duration::from_millis(100)).unwrap();
        let runtime = FakeRuntime::new(ContainerState::Running);
        let provider = ContainerProvider::new(
            ProviderId::Besu,
            config,
            ProviderPaths::new(dir.path()),
            prober,
            runtime.clone(),
        );
        let err = provider.init(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ControlError::Provisioning(_)));
        assert!(runtime.verbs().is_empty(), "nothing touched before keys are valid");
    }
}
