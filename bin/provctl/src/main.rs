//! Provider lifecycle controller entrypoint.

use std::{env, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use argh::from_env;
use provctl_cli_common::errors::{internal_error, user_error, DisplayableError, DisplayedError};
use provctl_common::logging::{self, LoggingInitConfig};
use provctl_config::{load_config, Config};
use provctl_providers::{Dispatcher, ProviderRegistry, Verb};
use provctl_workspace::WorkspaceSelector;
use tokio::runtime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    args::{Args, Command},
    cmd::{lifecycle, workspace},
    errors::displayed,
};

mod args;
mod cmd;
mod errors;
mod signal;

fn main() -> Result<ExitCode> {
    let args: Args = from_env();

    let rt = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    Ok(match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    })
}

async fn run(args: Args) -> Result<(), DisplayedError> {
    let config = load(&args)?;
    init_logging(&config)?;
    debug!(base_dir = %config.general.base_dir.display(), "configuration loaded");

    let selector = WorkspaceSelector::new(
        config.general.providers_dir(),
        config.general.workspace_pointer(),
    );
    let registry = ProviderRegistry::from_config(&config, &selector)
        .map_err(displayed("invalid provider configuration"))?;
    let dispatcher = Dispatcher::new(selector, registry);

    let explicit = args
        .provider
        .as_deref()
        .map(|name| dispatcher.resolve_name(name))
        .transpose()
        .map_err(displayed("unknown provider"))?;

    let cancel = CancellationToken::new();
    signal::cancel_on_signal(cancel.clone());

    let verb = match args.cmd {
        Command::Setup(_) => return workspace::setup(&dispatcher),
        Command::Select(select) => return workspace::select(&dispatcher, &select.provider),
        Command::Current(_) => return workspace::current(&dispatcher),
        Command::List(_) => return workspace::list(&dispatcher),
        Command::Status(_) => return workspace::status(&dispatcher, args.noisy).await,
        Command::Init(_) => Verb::Init,
        Command::Start(_) => Verb::Start,
        Command::Stop(_) => Verb::Stop,
        Command::Kill(_) => Verb::Kill,
    };
    lifecycle::run_verb(&dispatcher, explicit, verb, &cancel, args.noisy).await
}

/// Loads the configuration and anchors `base_dir` at the working directory.
///
/// Node command lines carry absolute state paths, which `kill` later matches
/// against running processes.
fn load(args: &Args) -> Result<Config, DisplayedError> {
    let overrides = args.get_all_overrides();
    let mut config = load_config(args.config.as_deref(), &overrides)
        .user_error("failed to load configuration")?;
    if config.general.base_dir.is_relative() {
        let cwd = env::current_dir().internal_error("cannot resolve working directory")?;
        config.general.base_dir = cwd.join(&config.general.base_dir);
    }
    Ok(config)
}

fn init_logging(config: &Config) -> Result<(), DisplayedError> {
    let log_dir: Option<PathBuf> = config.logging.log_dir.as_ref().map(|dir| {
        if dir.is_relative() {
            config.general.base_dir.join(dir)
        } else {
            dir.clone()
        }
    });
    logging::init_logging_from_config(LoggingInitConfig {
        service_name: "provctl",
        level: &config.logging.level,
        log_dir: log_dir.as_deref(),
        log_file_prefix: config.logging.log_file_prefix.as_deref(),
        json_format: config.logging.json_format,
        default_log_prefix: "provctl",
    })
    .map_err(|e| match e {
        logging::LoggingError::InvalidLevel(_) => user_error("invalid logging configuration")(e),
        other => internal_error("failed to initialize logging")(other),
    })
}
