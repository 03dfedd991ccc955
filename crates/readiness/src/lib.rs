//! Polls a provider endpoint until it accepts connections.

mod errors;
mod prober;

pub use errors::ProbeError;
pub use prober::{Readiness, ReadinessProber};
