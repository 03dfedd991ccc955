//! The four control verbs.

use provctl_cli_common::errors::DisplayedError;
use provctl_primitives::ProviderId;
use provctl_providers::{Dispatcher, Verb, VerbOutcome};
use tokio_util::sync::CancellationToken;

use crate::errors::displayed;

pub(crate) async fn run_verb(
    dispatcher: &Dispatcher,
    explicit: Option<ProviderId>,
    verb: Verb,
    cancel: &CancellationToken,
    noisy: bool,
) -> Result<(), DisplayedError> {
    let (id, outcome) = dispatcher
        .run(explicit, verb, cancel)
        .await
        .map_err(displayed(format!("{verb} failed")))?;
    let provider = dispatcher
        .registry()
        .get(id)
        .map_err(displayed("provider vanished from registry"))?;
    let paths = provider.paths();

    match outcome {
        VerbOutcome::Init(report) => {
            for (role, address) in &report.accounts {
                println!("{:<6} {address}", role.to_string());
            }
            println!("{id}: environment written to {}", paths.environment().display());
        }
        VerbOutcome::Start(report) => {
            println!("{id}: {report} at {}", provider.endpoint().url());
        }
        VerbOutcome::Stop(report) => println!("{id}: {report}"),
        VerbOutcome::Kill(report) => {
            for what in &report.removed {
                println!("removed {what}");
            }
            for warning in &report.warnings {
                if warning.is_failure() {
                    eprintln!("error: {warning}");
                } else {
                    eprintln!("warning: {warning}");
                }
            }
            // Teardown is best effort and exits zero either way.
            if report.has_failures() {
                let steps: Vec<&str> = report.failures().map(|w| w.step).collect();
                println!("{id}: torn down, cleanup incomplete ({})", steps.join(", "));
            } else {
                println!("{id}: torn down");
            }
        }
    }

    if noisy {
        println!("node log: {}", paths.node_log().display());
    }
    Ok(())
}
