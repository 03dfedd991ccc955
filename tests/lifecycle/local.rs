//! Full lifecycle of a local-process provider, driven through the same
//! dispatcher the CLI uses.

#![allow(unused_crate_dependencies, reason = "test dependencies shared across test suite")]

use std::{fs, time::Duration};

use integration_tests::harness::{FakeNode, TestWorkspace, KNOWN_ADDRESSES};
use provctl_config::ProviderConfig;
use provctl_primitives::{env_keys, ProviderId, Role};
use provctl_providers::{RunState, StartReport, StopReport, Verb, VerbOutcome};
use provctl_supervisor::proc;
use tokio::time;
use tokio_util::sync::CancellationToken;

const ID: ProviderId = ProviderId::GanacheLocal;
const FAKE_NODE: &str = env!("CARGO_BIN_EXE_fake-node");

/// First dev key, funded with the built-in balance.
const ALICE_ACCOUNT: &str = "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d,\
                             100000000000000000000";

#[tokio::test]
async fn test_init_start_stop_kill() {
    let node = FakeNode::new(FAKE_NODE).unwrap();
    let ws = TestWorkspace::new(&node).unwrap();
    let paths = ws.paths(ID);
    let cancel = CancellationToken::new();

    let dispatcher = ws.dispatcher();
    dispatcher.setup().unwrap();

    // init selects the provider and provisions it through a throwaway run.
    let (id, outcome) = dispatcher.run(Some(ID), Verb::Init, &cancel).await.unwrap();
    assert_eq!(id, ID);
    let report = match outcome {
        VerbOutcome::Init(report) => report,
        other => panic!("unexpected outcome {other:?}"),
    };
    let addresses: Vec<String> = report
        .accounts
        .iter()
        .map(|(_, addr)| addr.to_checksum(None))
        .collect();
    assert_eq!(addresses, KNOWN_ADDRESSES);
    assert_eq!(dispatcher.current().unwrap(), Some(ID));

    let record = paths.env_store().load().unwrap();
    record.require(&env_keys::required_keys()).unwrap();
    assert_eq!(record.get(env_keys::PROVIDER_NAME), Some("ganache-local"));
    assert_eq!(
        record.get(&env_keys::address_key(Role::Alice)),
        Some(KNOWN_ADDRESSES[0])
    );
    assert!(paths.artifact().exists());
    assert!(!paths.handle_file().exists());
    assert!(!paths.has_marker());

    let invocations = node.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(
        invocations[0].contains(&format!("--provision --port {}", node.port())),
        "{}",
        invocations[0]
    );
    let leftovers: Vec<_> = fs::read_dir(paths.dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".provision-"))
        .collect();
    assert!(leftovers.is_empty(), "scratch dirs left behind: {leftovers:?}");
    let snapshot = fs::read_to_string(paths.environment()).unwrap();

    // First start funds the provisioned accounts.
    let (_, outcome) = dispatcher.run(None, Verb::Start, &cancel).await.unwrap();
    let pid = match outcome {
        VerbOutcome::Start(StartReport::Started { pid: Some(pid) }) => pid,
        other => panic!("unexpected outcome {other:?}"),
    };
    assert!(proc::is_alive(pid, None));
    assert!(paths.handle_file().exists());
    assert!(paths.has_marker());
    let first = node.invocations().pop().unwrap();
    assert!(first.contains(&format!("--wallet.accounts {ALICE_ACCOUNT}")), "{first}");
    assert_eq!(first.matches("--wallet.accounts").count(), 3, "{first}");
    assert!(first.contains(&paths.chain_dir().display().to_string()), "{first}");

    // A second invocation sees the running node through its handle.
    let dispatcher = ws.dispatcher();
    let (_, outcome) = dispatcher.run(None, Verb::Start, &cancel).await.unwrap();
    assert!(
        matches!(
            outcome,
            VerbOutcome::Start(StartReport::AlreadyRunning { pid: Some(p) }) if p == pid
        ),
        "{outcome:?}"
    );
    let statuses = dispatcher.status().await.unwrap();
    let (status, active) = statuses.iter().find(|(s, _)| s.id == ID).unwrap();
    assert!(*active);
    assert_eq!(status.state, RunState::Running);

    let (_, outcome) = dispatcher.run(None, Verb::Stop, &cancel).await.unwrap();
    assert!(matches!(outcome, VerbOutcome::Stop(StopReport::Stopped)));
    assert!(!proc::is_alive(pid, None));
    assert!(!paths.handle_file().exists());
    assert_eq!(fs::read_to_string(paths.environment()).unwrap(), snapshot);

    let (_, outcome) = dispatcher.run(None, Verb::Stop, &cancel).await.unwrap();
    assert!(matches!(outcome, VerbOutcome::Stop(StopReport::NotRunning)));

    // Restarting reuses the chain and drops the first-start arguments.
    let (_, outcome) = dispatcher.run(None, Verb::Start, &cancel).await.unwrap();
    let restarted = match outcome {
        VerbOutcome::Start(StartReport::Started { pid: Some(pid) }) => pid,
        other => panic!("unexpected outcome {other:?}"),
    };
    let second = node.invocations().pop().unwrap();
    assert!(!second.contains("--wallet.accounts"), "{second}");

    let (_, outcome) = dispatcher.run(None, Verb::Kill, &cancel).await.unwrap();
    let report = match outcome {
        VerbOutcome::Kill(report) => report,
        other => panic!("unexpected outcome {other:?}"),
    };
    for step in ["node process", "environment record", "account artifact", "start marker"] {
        assert!(report.removed.iter().any(|r| r == step), "{step} not in {report:?}");
    }
    assert!(!proc::is_alive(restarted, None));
    assert!(!paths.environment().exists());
    assert!(!paths.artifact().exists());
    assert!(!paths.handle_file().exists());
    assert!(!paths.has_marker());

    // The pointer survives and resolves to the emptied directory.
    assert_eq!(dispatcher.current().unwrap(), Some(ID));
    assert!(paths.dir().is_dir());
    assert_eq!(fs::read_dir(paths.dir()).unwrap().count(), 0);

    let err = dispatcher.run(None, Verb::Start, &cancel).await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_kill_reaps_node_without_handle() {
    let node = FakeNode::new(FAKE_NODE).unwrap();
    let ws = TestWorkspace::new(&node).unwrap();
    let paths = ws.paths(ID);
    let cancel = CancellationToken::new();

    let dispatcher = ws.dispatcher();
    dispatcher.setup().unwrap();
    dispatcher.run(Some(ID), Verb::Init, &cancel).await.unwrap();
    let (_, outcome) = dispatcher.run(None, Verb::Start, &cancel).await.unwrap();
    let pid = match outcome {
        VerbOutcome::Start(StartReport::Started { pid: Some(pid) }) => pid,
        other => panic!("unexpected outcome {other:?}"),
    };

    // Lose track of the node, as an interrupted invocation would.
    fs::remove_file(paths.handle()).unwrap();

    let (_, outcome) = dispatcher.run(None, Verb::Kill, &cancel).await.unwrap();
    let report = match outcome {
        VerbOutcome::Kill(report) => report,
        other => panic!("unexpected outcome {other:?}"),
    };
    assert!(!report.is_clean());
    assert!(
        report.removed.iter().any(|r| r.contains("orphaned")),
        "{report:?}"
    );

    // KILL is asynchronous; give the kernel a moment.
    for _ in 0..50 {
        if !proc::is_alive(pid, None) {
            break;
        }
        time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!proc::is_alive(pid, None));
    assert!(!paths.environment().exists());
}

#[tokio::test]
async fn test_failed_init_keeps_previous_record() {
    let node = FakeNode::new(FAKE_NODE).unwrap();
    let mut ws = TestWorkspace::new(&node).unwrap();
    let cancel = CancellationToken::new();

    let dispatcher = ws.dispatcher();
    dispatcher.setup().unwrap();
    dispatcher.run(Some(ID), Verb::Init, &cancel).await.unwrap();
    let paths = ws.paths(ID);
    let snapshot = fs::read_to_string(paths.environment()).unwrap();

    // A node that exits before printing anything.
    if let Some(ProviderConfig::Local(local)) =
        ws.config_mut().providers.get_mut(ID.as_str())
    {
        local.provision_args = vec!["--provision".to_owned()];
    }
    let dispatcher = ws.dispatcher();
    let err = dispatcher.run(None, Verb::Init, &cancel).await.unwrap_err();
    assert_eq!(err.exit_code(), 3, "{err}");
    assert_eq!(fs::read_to_string(paths.environment()).unwrap(), snapshot);
    assert!(paths.artifact().exists());
}
