//! CLI argument parsing.

use std::path::PathBuf;

use argh::FromArgs;

#[derive(Debug, FromArgs)]
#[argh(description = "Provider lifecycle controller for the demo networks")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub config: Option<PathBuf>,

    /// Other generic overrides to the config toml.
    /// Will be used, for example, as `-o general.readiness_timeout_secs=60`
    #[argh(option, short = 'o', description = "generic config overrides")]
    pub overrides: Vec<String>,

    #[argh(
        option,
        short = 'p',
        description = "provider to act on; it is selected before the command runs"
    )]
    pub provider: Option<String>,

    #[argh(switch, description = "debug logging and node log locations")]
    pub noisy: bool,

    #[argh(switch, description = "emit logs as JSON")]
    pub json_logs: bool,

    #[argh(subcommand)]
    pub cmd: Command,
}

impl Args {
    /// Overrides from the user followed by those implied by switches.
    pub(crate) fn get_all_overrides(&self) -> Vec<String> {
        let mut overrides = self.overrides.clone();
        if self.noisy {
            overrides.push("logging.level=debug".to_owned());
        }
        if self.json_logs {
            overrides.push("logging.json_format=true".to_owned());
        }
        overrides
    }
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
pub(crate) enum Command {
    Setup(SetupArgs),
    Select(SelectArgs),
    Current(CurrentArgs),
    List(ListArgs),
    Status(StatusArgs),
    Init(InitArgs),
    Start(StartArgs),
    Stop(StopArgs),
    Kill(KillArgs),
}

/// Create state directories for all configured providers
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "setup")]
pub(crate) struct SetupArgs {}

/// Point the workspace at a provider
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "select")]
pub(crate) struct SelectArgs {
    #[argh(positional, description = "provider name")]
    pub provider: String,
}

/// Print the active provider
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "current")]
pub(crate) struct CurrentArgs {}

/// List configured providers
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "list")]
pub(crate) struct ListArgs {}

/// Show node state and record presence for every provider
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "status")]
pub(crate) struct StatusArgs {}

/// Destroy provider data and provision fresh accounts
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "init")]
pub(crate) struct InitArgs {}

/// Start the provider and wait until it is ready
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "start")]
pub(crate) struct StartArgs {}

/// Stop the provider, keeping its data
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "stop")]
pub(crate) struct StopArgs {}

/// Stop the provider and remove all of its data
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "kill")]
pub(crate) struct KillArgs {}
