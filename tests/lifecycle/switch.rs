//! Switching the active provider while others keep their state.

#![allow(unused_crate_dependencies, reason = "test dependencies shared across test suite")]

use std::fs;

use integration_tests::harness::{FakeNode, TestWorkspace};
use provctl_primitives::{env_keys, ProviderId};
use provctl_providers::{ProviderPaths, StartReport, StopReport, Verb, VerbOutcome};
use provctl_workspace::Selection;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_switching_keeps_each_provider_state() {
    let node = FakeNode::new(env!("CARGO_BIN_EXE_fake-node")).unwrap();
    let ws = TestWorkspace::new(&node).unwrap();
    let cancel = CancellationToken::new();
    let dispatcher = ws.dispatcher();
    dispatcher.setup().unwrap();

    dispatcher
        .run(Some(ProviderId::GanacheLocal), Verb::Init, &cancel)
        .await
        .unwrap();
    let local = ws.paths(ProviderId::GanacheLocal);
    let local_record = fs::read_to_string(local.environment()).unwrap();

    // The tester provider is external with no readiness check by default.
    let (id, _) = dispatcher
        .run(Some(ProviderId::Tester), Verb::Init, &cancel)
        .await
        .unwrap();
    assert_eq!(id, ProviderId::Tester);
    assert_eq!(dispatcher.current().unwrap(), Some(ProviderId::Tester));
    let (_, outcome) = dispatcher.run(None, Verb::Start, &cancel).await.unwrap();
    assert!(matches!(outcome, VerbOutcome::Start(StartReport::Unchecked)));
    let (_, outcome) = dispatcher.run(None, Verb::Stop, &cancel).await.unwrap();
    assert!(matches!(outcome, VerbOutcome::Stop(StopReport::Unmanaged)));

    // The active record is reachable through the workspace pointer.
    let through_pointer = ProviderPaths::new(ws.selector().pointer()).env_store();
    let record = through_pointer.load().unwrap();
    assert_eq!(record.get(env_keys::PROVIDER_NAME), Some("tester"));

    assert_eq!(
        dispatcher.select(ProviderId::GanacheLocal).unwrap(),
        Selection::Changed {
            previous: Some(ProviderId::Tester)
        }
    );
    assert_eq!(
        dispatcher.select(ProviderId::GanacheLocal).unwrap(),
        Selection::Unchanged
    );
    assert_eq!(
        fs::read_to_string(local.environment()).unwrap(),
        local_record
    );

    let statuses = dispatcher.status().await.unwrap();
    assert_eq!(statuses.len(), ProviderId::ALL.len());
    let active: Vec<_> = statuses
        .iter()
        .filter(|(_, active)| *active)
        .map(|(s, _)| s.id)
        .collect();
    assert_eq!(active, vec![ProviderId::GanacheLocal]);
    assert!(statuses
        .iter()
        .filter(|(s, _)| matches!(s.id, ProviderId::GanacheLocal | ProviderId::Tester))
        .all(|(s, _)| s.provisioned));

    // Killing the active provider leaves the other one alone.
    let (_, outcome) = dispatcher.run(None, Verb::Kill, &cancel).await.unwrap();
    assert!(matches!(outcome, VerbOutcome::Kill(_)));
    assert!(!local.environment().exists());
    assert!(ws.paths(ProviderId::Tester).environment().exists());
}

#[tokio::test]
async fn test_select_requires_setup() {
    let node = FakeNode::new(env!("CARGO_BIN_EXE_fake-node")).unwrap();
    let ws = TestWorkspace::new(&node).unwrap();
    let dispatcher = ws.dispatcher();

    let err = dispatcher.select(ProviderId::Tester).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(dispatcher.current().unwrap(), None);
    assert!(!ws.selector().provider_dir(ProviderId::Tester).exists());
}
