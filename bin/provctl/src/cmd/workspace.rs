//! Commands that inspect or move the workspace pointer.

use provctl_cli_common::errors::DisplayedError;
use provctl_providers::Dispatcher;
use provctl_workspace::Selection;

use crate::errors::displayed;

pub(crate) fn setup(dispatcher: &Dispatcher) -> Result<(), DisplayedError> {
    let created = dispatcher
        .setup()
        .map_err(displayed("failed to create provider directories"))?;
    for dir in &created {
        println!("created {}", dir.display());
    }
    if created.is_empty() {
        println!("all provider directories already exist");
    }
    Ok(())
}

pub(crate) fn select(dispatcher: &Dispatcher, name: &str) -> Result<(), DisplayedError> {
    let id = dispatcher
        .resolve_name(name)
        .map_err(displayed("cannot select provider"))?;
    match dispatcher
        .select(id)
        .map_err(displayed("cannot select provider"))?
    {
        Selection::Changed { previous: Some(prev) } => println!("switched from {prev} to {id}"),
        Selection::Changed { previous: None } => println!("selected {id}"),
        Selection::Unchanged => println!("{id} already selected"),
    }
    Ok(())
}

pub(crate) fn current(dispatcher: &Dispatcher) -> Result<(), DisplayedError> {
    match dispatcher
        .current()
        .map_err(displayed("cannot read workspace"))?
    {
        Some(id) => println!("{id}"),
        None => println!("no provider selected"),
    }
    Ok(())
}

pub(crate) fn list(dispatcher: &Dispatcher) -> Result<(), DisplayedError> {
    for provider in dispatcher.registry().iter() {
        println!(
            "{:<14} {:<10} {}",
            provider.id().as_str(),
            provider.kind().as_str(),
            provider.endpoint().url()
        );
    }
    Ok(())
}

pub(crate) async fn status(dispatcher: &Dispatcher, noisy: bool) -> Result<(), DisplayedError> {
    let statuses = dispatcher
        .status()
        .await
        .map_err(displayed("cannot read provider status"))?;
    for (status, active) in statuses {
        println!(
            "{} {:<14} {:<10} {:<8} {:<24} provisioned={} started={}",
            if active { "*" } else { " " },
            status.id.as_str(),
            status.kind.as_str(),
            status.state.to_string(),
            status.endpoint.to_string(),
            yes_no(status.provisioned),
            yes_no(status.started_before),
        );
    }
    if noisy {
        println!("workspace pointer: {}", dispatcher.selector().pointer().display());
    }
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}
