use std::{fmt, time::Duration};

use provctl_primitives::Endpoint;
use provctl_readiness::ReadinessProber;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    errors::SupervisorError,
    handle::{HandleFile, ProcessHandle},
    proc::{self, Signal},
    spawn::{ensure_endpoint_free, NodeCommand, SpawnedNode},
};

/// Lifecycle state of the supervised node.
///
/// `Starting` and `Stopping` only exist within a single invocation; across
/// invocations the node is either `Absent` or `Running`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeState {
    Absent,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Absent => "absent",
            NodeState::Starting => "starting",
            NodeState::Running => "running",
            NodeState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StartOutcome {
    AlreadyRunning { pid: u32 },
    Started { pid: u32, elapsed: Duration },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StopOutcome {
    Stopped { pid: u32, forced: bool },
    NotRunning,
    /// The handle named a process that no longer exists.
    StaleHandle { pid: u32 },
}

/// Owns the lifecycle of one long-running node through its handle file.
#[derive(Clone, Debug)]
pub struct ProcessSupervisor {
    handle: HandleFile,
    prober: ReadinessProber,
    stop_timeout: Duration,
}

impl ProcessSupervisor {
    pub fn new(handle: HandleFile, prober: ReadinessProber, stop_timeout: Duration) -> Self {
        Self {
            handle,
            prober,
            stop_timeout,
        }
    }

    pub fn handle_file(&self) -> &HandleFile {
        &self.handle
    }

    /// Live handle, if any. Stale handles are removed.
    pub fn running(&self) -> Result<Option<ProcessHandle>, SupervisorError> {
        let Some(handle) = self.handle.load()? else {
            return Ok(None);
        };
        if handle.is_alive() {
            return Ok(Some(handle));
        }
        warn!(
            pid = handle.pid,
            path = ?self.handle.path(),
            "removing stale process handle"
        );
        self.handle.remove()?;
        Ok(None)
    }

    pub fn state(&self) -> Result<NodeState, SupervisorError> {
        Ok(match self.running()? {
            Some(_) => NodeState::Running,
            None => NodeState::Absent,
        })
    }

    /// Brings the node to `Running`.
    ///
    /// The endpoint must be free before the spawn. The handle is written only
    /// once the endpoint accepted a connection and the child is still alive.
    /// On any failure the child is killed and nothing is persisted.
    pub async fn start(
        &self,
        cmd: &NodeCommand,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome, SupervisorError> {
        if let Some(handle) = self.running()? {
            info!(pid = handle.pid, "node already running");
            return Ok(StartOutcome::AlreadyRunning { pid: handle.pid });
        }

        ensure_endpoint_free(&self.prober, endpoint).await?;

        transition(NodeState::Absent, NodeState::Starting);
        let mut node = SpawnedNode::spawn(cmd)?;
        let pid = node.pid();

        let elapsed = match node.wait_ready(&self.prober, endpoint, cancel).await {
            Ok(elapsed) => elapsed,
            Err(e) => {
                warn!(pid, %e, "node failed to start");
                // Reap quickly; the drop guard covers a failing terminate.
                let _ = node.terminate().await;
                transition(NodeState::Starting, NodeState::Absent);
                return Err(e);
            }
        };

        let handle = node.detach();
        if let Err(e) = self.handle.store(&handle) {
            let _ = proc::signal_group(pid, Signal::Kill);
            transition(NodeState::Starting, NodeState::Absent);
            return Err(e);
        }

        transition(NodeState::Starting, NodeState::Running);
        info!(pid, %endpoint, ?elapsed, "node running");
        Ok(StartOutcome::Started { pid, elapsed })
    }

    /// Signals the node and removes the handle.
    ///
    /// Sends TERM, waits up to the stop timeout and escalates to KILL.
    pub async fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let Some(handle) = self.handle.load()? else {
            debug!("no process handle, nothing to stop");
            return Ok(StopOutcome::NotRunning);
        };
        if !handle.is_alive() {
            warn!(pid = handle.pid, "process handle is stale, treating node as stopped");
            self.handle.remove()?;
            return Ok(StopOutcome::StaleHandle { pid: handle.pid });
        }

        transition(NodeState::Running, NodeState::Stopping);
        let forced = self.terminate(&handle).await?;
        self.handle.remove()?;
        transition(NodeState::Stopping, NodeState::Absent);
        info!(pid = handle.pid, forced, "node stopped");
        Ok(StopOutcome::Stopped {
            pid: handle.pid,
            forced,
        })
    }

    /// Returns whether KILL was needed.
    async fn terminate(&self, handle: &ProcessHandle) -> Result<bool, SupervisorError> {
        let pid = handle.pid;
        signal(pid, Signal::Term)?;
        if self.wait_gone(handle, self.stop_timeout).await {
            return Ok(false);
        }

        warn!(pid, timeout = ?self.stop_timeout, "node ignored TERM, sending KILL");
        signal(pid, Signal::Kill)?;
        if !self.wait_gone(handle, self.stop_timeout).await {
            warn!(pid, "node still present after KILL");
        }
        Ok(true)
    }

    async fn wait_gone(&self, handle: &ProcessHandle, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            if !handle.is_alive() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            let next = (Instant::now() + self.prober.interval()).min(deadline);
            time::sleep_until(next).await;
        }
    }

    /// Kills processes whose command line contains `marker`, catching nodes
    /// orphaned by an interrupted start. Returns the pids signalled.
    pub fn kill_orphans(&self, marker: &str) -> Vec<u32> {
        let mut killed = Vec::new();
        for pid in proc::find_by_cmdline(marker) {
            match proc::signal_group(pid, Signal::Kill) {
                Ok(true) => {
                    warn!(pid, %marker, "killed orphaned node process");
                    killed.push(pid);
                }
                Ok(false) => debug!(pid, "orphan exited before it could be killed"),
                Err(e) => warn!(pid, %e, "failed to kill orphaned node process"),
            }
        }
        killed
    }
}

fn signal(pid: u32, sig: Signal) -> Result<(), SupervisorError> {
    let delivered =
        proc::signal_group(pid, sig).map_err(|source| SupervisorError::Signal { pid, source })?;
    if !delivered {
        debug!(pid, %sig, "signal not delivered, process likely gone");
    }
    Ok(())
}

fn transition(from: NodeState, to: NodeState) {
    debug!(%from, %to, "node state transition");
}
