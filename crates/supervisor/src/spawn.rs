use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    process::Stdio,
    time::Duration,
};

use provctl_primitives::Endpoint;
use provctl_readiness::{Readiness, ReadinessProber};
use tokio::{
    process::{Child, Command},
    time,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    errors::SupervisorError,
    handle::ProcessHandle,
    proc::{self, Signal},
};

/// Grace period for a child to exit after TERM before KILL is sent.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Fails with [`SupervisorError::EndpointBusy`] when something already
/// accepts connections on `endpoint`.
///
/// Run before spawning, so a readiness check afterwards can only be passed
/// by the new node.
pub async fn ensure_endpoint_free(
    prober: &ReadinessProber,
    endpoint: &Endpoint,
) -> Result<(), SupervisorError> {
    if ReadinessProber::probe_once(endpoint, prober.interval()).await {
        warn!(%endpoint, "endpoint is already served");
        return Err(SupervisorError::EndpointBusy {
            endpoint: endpoint.to_string(),
        });
    }
    Ok(())
}

/// A node invocation with its arguments fully substituted.
#[derive(Clone, Debug)]
pub struct NodeCommand {
    pub program: String,
    pub args: Vec<String>,

    /// File stdout and stderr are appended to.
    pub log_path: PathBuf,
}

impl NodeCommand {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            log_path: log_path.into(),
        }
    }
}

/// A child node owned by this invocation.
///
/// Dropping it kills the node's process group unless it was handed off with
/// [`SpawnedNode::detach`].
#[derive(Debug)]
pub struct SpawnedNode {
    child: Child,
    pid: u32,
    program: String,
    released: bool,
}

impl SpawnedNode {
    /// Spawns the node in its own process group with stdin closed.
    pub fn spawn(cmd: &NodeCommand) -> Result<Self, SupervisorError> {
        if let Some(dir) = cmd.log_path.parent() {
            fs::create_dir_all(dir).map_err(SupervisorError::io(dir))?;
        }
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cmd.log_path)
            .map_err(SupervisorError::io(&cmd.log_path))?;
        let log_err = log
            .try_clone()
            .map_err(SupervisorError::io(&cmd.log_path))?;

        let child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_err)
            .process_group(0)
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                program: cmd.program.clone(),
                source,
            })?;

        let pid = child
            .id()
            .ok_or_else(|| SupervisorError::NoPid(cmd.program.clone()))?;
        debug!(pid, program = %cmd.program, args = ?cmd.args, "spawned node");

        Ok(Self {
            child,
            pid,
            program: cmd.program.clone(),
            released: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Fails with [`SupervisorError::EarlyExit`] if the node already exited.
    pub fn check_running(&mut self) -> Result<(), SupervisorError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Err(SupervisorError::EarlyExit {
                program: self.program.clone(),
                status: status.to_string(),
            }),
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(pid = self.pid, %e, "could not poll child status");
                Ok(())
            }
        }
    }

    /// Waits for `endpoint` while watching for the node to die.
    ///
    /// The node is checked once more after the endpoint answers, so a child
    /// that failed to bind is not reported ready.
    pub async fn wait_ready(
        &mut self,
        prober: &ReadinessProber,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Duration, SupervisorError> {
        let program = self.program.clone();
        let elapsed = tokio::select! {
            res = prober.wait_ready(endpoint, cancel) => match res? {
                Readiness::Ready { elapsed } => elapsed,
                Readiness::TimedOut { .. } => {
                    return Err(SupervisorError::NotReady {
                        endpoint: endpoint.to_string(),
                        timeout: prober.timeout(),
                    })
                }
            },
            status = self.child.wait() => {
                let status = status.map(|s| s.to_string()).unwrap_or_else(|e| e.to_string());
                return Err(SupervisorError::EarlyExit { program, status });
            }
        };
        self.check_running()?;
        Ok(elapsed)
    }

    /// Stops the node: TERM to its group, then KILL after a grace period.
    pub async fn terminate(mut self) -> Result<(), SupervisorError> {
        self.released = true;
        if self.child.try_wait().ok().flatten().is_some() {
            return Ok(());
        }

        proc::signal_group(self.pid, Signal::Term).map_err(|source| SupervisorError::Signal {
            pid: self.pid,
            source,
        })?;
        if time::timeout(TERMINATE_GRACE, self.child.wait()).await.is_ok() {
            debug!(pid = self.pid, "node terminated");
            return Ok(());
        }

        warn!(pid = self.pid, "node ignored TERM, sending KILL");
        proc::signal_group(self.pid, Signal::Kill).map_err(|source| SupervisorError::Signal {
            pid: self.pid,
            source,
        })?;
        let _ = self.child.wait().await;
        Ok(())
    }

    /// Releases ownership so the node outlives this invocation.
    pub fn detach(mut self) -> ProcessHandle {
        self.released = true;
        ProcessHandle::capture(self.pid, self.program.clone())
    }
}

impl Drop for SpawnedNode {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        debug!(pid = self.pid, "killing abandoned node");
        let _ = proc::signal_group(self.pid, Signal::Kill);
        let _ = self.child.start_kill();
        let _ = self.child.try_wait();
    }
}
