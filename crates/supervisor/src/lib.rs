//! Supervision of externally spawned node processes.
//!
//! The controller is not a daemon: each invocation starts from the handle
//! file, verifies the process it names is still the same process, and acts on
//! that. Signals are delivered with the system `kill` utility.

mod errors;
mod handle;
pub mod proc;
mod spawn;
mod supervisor;

pub use errors::SupervisorError;
pub use handle::{HandleFile, ProcessHandle};
pub use spawn::{ensure_endpoint_free, NodeCommand, SpawnedNode};
pub use supervisor::{NodeState, ProcessSupervisor, StartOutcome, StopOutcome};
