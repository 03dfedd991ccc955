use std::time::Duration;

use provctl_primitives::Endpoint;
use tokio::{
    net::TcpStream,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::errors::ProbeError;

/// Result of waiting on an endpoint.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Readiness {
    Ready { elapsed: Duration },
    TimedOut { elapsed: Duration },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Readiness::Ready { elapsed } | Readiness::TimedOut { elapsed } => *elapsed,
        }
    }
}

/// Bounded TCP connect poller.
#[derive(Copy, Clone, Debug)]
pub struct ReadinessProber {
    interval: Duration,
    timeout: Duration,
}

impl ReadinessProber {
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, ProbeError> {
        if interval.is_zero() {
            return Err(ProbeError::ZeroInterval);
        }
        Ok(Self { interval, timeout })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Single connection attempt bounded by `budget`.
    pub async fn probe_once(endpoint: &Endpoint, budget: Duration) -> bool {
        match time::timeout(budget, TcpStream::connect(endpoint.authority())).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                trace!(%endpoint, %e, "endpoint not accepting connections");
                false
            }
            Err(_) => false,
        }
    }

    /// Polls until the endpoint accepts a connection, the timeout elapses, or
    /// `cancel` fires.
    ///
    /// Returns no later than one poll interval past the timeout.
    pub async fn wait_ready(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Readiness, ProbeError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(ProbeError::Cancelled);
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed = started.elapsed();
                debug!(%endpoint, attempts, ?elapsed, "endpoint never became ready");
                return Ok(Readiness::TimedOut { elapsed });
            }

            attempts += 1;
            let budget = deadline - now;
            let ready = tokio::select! {
                ready = Self::probe_once(endpoint, budget) => ready,
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            };
            if ready {
                let elapsed = started.elapsed();
                debug!(%endpoint, attempts, ?elapsed, "endpoint ready");
                return Ok(Readiness::Ready { elapsed });
            }

            let next = (Instant::now() + self.interval).min(deadline);
            tokio::select! {
                _ = time::sleep_until(next) => {}
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            }
        }
    }
}
