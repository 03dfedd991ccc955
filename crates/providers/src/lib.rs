//! Provider control protocol.
//!
//! Every provider implements the same four verbs through [`ProviderControl`].
//! The [`Dispatcher`] resolves the target provider, either named explicitly or
//! taken from the workspace pointer, and forwards the verb to it.

mod container;
mod dispatcher;
mod errors;
mod external;
mod local;
mod paths;
mod protocol;
mod registry;
mod template;

pub use container::{CommandOutput, ContainerProvider, ContainerRuntime, DockerCli};
pub use dispatcher::{Dispatcher, Verb, VerbOutcome};
pub use errors::{CleanupReport, CleanupWarning, ControlError, WarningKind};
pub use external::ExternalProvider;
pub use local::LocalNodeProvider;
pub use paths::ProviderPaths;
pub use protocol::{
    InitReport, ProviderControl, ProviderStatus, RunState, StartReport, StopReport,
};
pub use registry::ProviderRegistry;
pub use template::{render, render_all, TemplateVars};
