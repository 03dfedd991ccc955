use std::{fs, io, path::Path};

use async_trait::async_trait;
use provctl_primitives::{Endpoint, Role};
use provctl_readiness::ReadinessProber;
use provctl_supervisor::{ensure_endpoint_free, NodeCommand, SpawnedNode};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    errors::ProvisionError,
    keys::{parse_keys, PrivateKey},
    output::parse_private_keys,
};

/// Where a provider's funded keys come from.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Produces at least [`Role::COUNT`] keys, in assignment order.
    async fn generate(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PrivateKey>, ProvisionError>;
}

/// Keys fixed in configuration, for networks that pre-fund known accounts.
#[derive(Clone, Debug)]
pub struct StaticKeySource {
    keys: Vec<String>,
}

impl StaticKeySource {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl AccountSource for StaticKeySource {
    async fn generate(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Vec<PrivateKey>, ProvisionError> {
        if self.keys.len() < Role::COUNT {
            return Err(ProvisionError::NotEnoughAccounts {
                needed: Role::COUNT,
                found: self.keys.len(),
            });
        }
        parse_keys(&self.keys)
    }
}

/// Runs the node once, only to read the accounts it generates at boot.
#[derive(Debug)]
pub struct ThrowawayNodeSource {
    command: NodeCommand,
    endpoint: Endpoint,
    prober: ReadinessProber,
}

impl ThrowawayNodeSource {
    /// `command.log_path` is where the banner is read from.
    pub fn new(command: NodeCommand, endpoint: Endpoint, prober: ReadinessProber) -> Self {
        Self {
            command,
            endpoint,
            prober,
        }
    }

    fn output_path(&self) -> &Path {
        &self.command.log_path
    }

    async fn read_accounts(
        &self,
        node: &mut SpawnedNode,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ProvisionError> {
        node.wait_ready(&self.prober, &self.endpoint, cancel).await?;
        self.collect_keys(node, cancel).await
    }

    /// Polls the node output until enough keys appear or the timeout passes.
    async fn collect_keys(
        &self,
        node: &mut SpawnedNode,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ProvisionError> {
        let deadline = Instant::now() + self.prober.timeout();
        loop {
            let output = match fs::read_to_string(self.output_path()) {
                Ok(s) => s,
                Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(ProvisionError::io(self.output_path())(e)),
            };
            let keys = parse_private_keys(&output);
            if keys.len() >= Role::COUNT || Instant::now() >= deadline {
                return Ok(keys);
            }

            if let Err(e) = node.check_running() {
                // The banner may have been flushed right before exit.
                let output = fs::read_to_string(self.output_path()).unwrap_or_default();
                let keys = parse_private_keys(&output);
                if keys.len() >= Role::COUNT {
                    return Ok(keys);
                }
                return Err(e.into());
            }

            let next = (Instant::now() + self.prober.interval()).min(deadline);
            tokio::select! {
                _ = time::sleep_until(next) => {}
                _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
            }
        }
    }
}

#[async_trait]
impl AccountSource for ThrowawayNodeSource {
    async fn generate(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PrivateKey>, ProvisionError> {
        // A foreign listener would pass readiness and hide a node that never bound.
        ensure_endpoint_free(&self.prober, &self.endpoint).await?;

        info!(program = %self.command.program, "starting throwaway node to generate accounts");
        let mut node = SpawnedNode::spawn(&self.command)?;

        let res = self.read_accounts(&mut node, cancel).await;

        // Reaped before any result is returned, success or not.
        node.terminate().await?;

        let raw = res?;
        debug!(found = raw.len(), "read generated keys");
        if raw.len() < Role::COUNT {
            return Err(ProvisionError::NotEnoughAccounts {
                needed: Role::COUNT,
                found: raw.len(),
            });
        }
        parse_keys(&raw)
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use provctl_supervisor::SupervisorError;
    use tokio::{net::TcpListener, task::JoinHandle};

    use super::*;

    const BANNER: &str = "Private Keys\n==================\n\
        (0) 0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d\n\
        (1) 0x6cbed15c793ce57650b9877cf6fa156fbef513c4e6134f022a85b1ffdd59b2a1\n\
        (2) 0x6370fd033278c143179d81c5526140625662b8daa446c22ee2d73db3707e620c\n\n";

    fn fake_node(script: String, log: PathBuf) -> NodeCommand {
        NodeCommand::new("sh", vec!["-c".to_owned(), script], log)
    }

    async fn free_endpoint() -> Endpoint {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Endpoint::new("127.0.0.1", l.local_addr().unwrap().port())
    }

    /// Serves `endpoint` once the node has printed something.
    fn serve_after_output(log: PathBuf, endpoint: &Endpoint) -> JoinHandle<()> {
        let addr = endpoint.authority();
        tokio::spawn(async move {
            while fs::metadata(&log).map(|m| m.len() == 0).unwrap_or(true) {
                time::sleep(Duration::from_millis(10)).await;
            }
            let listener = TcpListener::bind(addr).await.unwrap();
            loop {
                let _ = listener.accept().await;
            }
        })
    }

    #[tokio::test]
    async fn test_static_source() {
        let cancel = CancellationToken::new();
        let keys = StaticKeySource::new(vec![
            "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d".to_owned(),
            "0x6cbed15c793ce57650b9877cf6fa156fbef513c4e6134f022a85b1ffdd59b2a1".to_owned(),
            "0x6370fd033278c143179d81c5526140625662b8daa446c22ee2d73db3707e620c".to_owned(),
        ])
        .generate(&cancel)
        .await
        .unwrap();
        assert_eq!(keys.len(), 3);

        let err = StaticKeySource::new(Vec::new())
            .generate(&cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::NotEnoughAccounts { found: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_throwaway_node_reads_banner() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("provision.log");
        let endpoint = free_endpoint().await;
        let server = serve_after_output(log.clone(), &endpoint);
        let prober =
            ReadinessProber::new(Duration::from_millis(50), Duration::from_secs(5)).unwrap();

        let script = format!("printf '%s' '{BANNER}'; exec sleep 30");
        let source = ThrowawayNodeSource::new(fake_node(script, log), endpoint, prober);

        let keys = source.generate(&CancellationToken::new()).await.unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(
            keys[0].address().to_checksum(None),
            "0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1"
        );
        server.abort();
    }

    #[tokio::test]
    async fn test_throwaway_node_with_too_few_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("provision.log");
        let endpoint = free_endpoint().await;
        let server = serve_after_output(log.clone(), &endpoint);
        let prober =
            ReadinessProber::new(Duration::from_millis(50), Duration::from_millis(400)).unwrap();

        let script = "echo 'Private Keys'; \
             echo '(0) 0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d'; \
             exec sleep 30"
            .to_owned();
        let source = ThrowawayNodeSource::new(fake_node(script, log), endpoint, prober);

        let err = source.generate(&CancellationToken::new()).await.unwrap_err();
        assert!(
            matches!(err, ProvisionError::NotEnoughAccounts { needed: 3, found: 1 }),
            "{err:?}"
        );
        server.abort();
    }

    #[tokio::test]
    async fn test_throwaway_node_refuses_busy_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("provision.log");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::new("127.0.0.1", listener.local_addr().unwrap().port());
        let prober =
            ReadinessProber::new(Duration::from_millis(50), Duration::from_secs(5)).unwrap();

        let script = format!("printf '%s' '{BANNER}'; exec sleep 30");
        let source = ThrowawayNodeSource::new(fake_node(script, log.clone()), endpoint, prober);

        let err = source.generate(&CancellationToken::new()).await.unwrap_err();
        assert!(
            matches!(err, ProvisionError::Node(SupervisorError::EndpointBusy { .. })),
            "{err:?}"
        );
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn test_throwaway_node_that_dies() {
        let dir = tempfile::tempdir().unwrap();
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::new("127.0.0.1", l.local_addr().unwrap().port());
        drop(l);
        let prober =
            ReadinessProber::new(Duration::from_millis(50), Duration::from_secs(5)).unwrap();

        let source = ThrowawayNodeSource::new(
            fake_node("exit 1".to_owned(), dir.path().join("provision.log")),
            endpoint,
            prober,
        );
        let err = source.generate(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Node(_)), "{err:?}");
    }
}
