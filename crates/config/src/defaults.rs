//! Built-in provider table.
//!
//! These are development networks only. Every key below is public knowledge
//! and must never hold real funds.

use std::collections::BTreeMap;

use provctl_primitives::ProviderId;

use crate::config::{
    Config, ContainerConfig, ExternalConfig, GeneralConfig, LocalNodeConfig, LoggingConfig,
    ProviderConfig,
};

/// Mnemonic ganache uses for `--wallet.deterministic`.
pub const DEV_MNEMONIC: &str =
    "myth like bonus scare over problem client lizard pioneer submit female collect";

/// First accounts derived from [`DEV_MNEMONIC`].
pub const GANACHE_DETERMINISTIC_KEYS: [&str; 3] = [
    "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d",
    "0x6cbed15c793ce57650b9877cf6fa156fbef513c4e6134f022a85b1ffdd59b2a1",
    "0x6370fd033278c143179d81c5526140625662b8daa446c22ee2d73db3707e620c",
];

/// Accounts pre-funded by besu's `--network=dev` genesis.
const BESU_DEV_KEYS: [&str; 3] = [
    "0x8f2a55949038a9610f50fb23b5883af3b4ecb3c3bb792cbcefbd1542c692be63",
    "0xc87509a1c067bbde78beb793e6fa76530b6382a4c0241e5e4a9ec0a0f44dc0d3",
    "0xae6ae8e5ccbfb04590405997ee2d52d2b330726137b875053c36d94e974d162f",
];

const LOCALHOST: &str = "127.0.0.1";

const DEFAULT_RPC_PORT: u16 = 8545;

const GANACHE_GUI_PORT: u16 = 7545;

const DEFAULT_NETWORK_ID: u64 = 1337;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn ganache_local() -> LocalNodeConfig {
    let args = strings(&[
        "--server.host",
        "{host}",
        "--server.port",
        "{port}",
        "--chain.networkId",
        "{network_id}",
        "--database.dbPath",
        "{chain_dir}",
        "--wallet.mnemonic",
        "{mnemonic}",
    ]);
    // `--wallet.totalAccounts` and `--wallet.accounts` are mutually exclusive.
    let mut provision_args = args.clone();
    provision_args.extend(strings(&["--wallet.totalAccounts", "{account_count}"]));
    let first_start_args = strings(&[
        "--wallet.accounts",
        "{alice_account}",
        "--wallet.accounts",
        "{bob_account}",
        "--wallet.accounts",
        "{carol_account}",
    ]);
    LocalNodeConfig {
        host: LOCALHOST.to_owned(),
        port: DEFAULT_RPC_PORT,
        network_id: DEFAULT_NETWORK_ID,
        command: "ganache".to_owned(),
        mnemonic: DEV_MNEMONIC.to_owned(),
        args,
        provision_args,
        first_start_args,
    }
}

fn besu() -> ContainerConfig {
    ContainerConfig {
        host: LOCALHOST.to_owned(),
        port: DEFAULT_RPC_PORT,
        image: "hyperledger/besu:latest".to_owned(),
        container_port: DEFAULT_RPC_PORT,
        runtime: "docker".to_owned(),
        container_name: None,
        data_mount: Some("/var/lib/besu".to_owned()),
        args: strings(&[
            "--network=dev",
            "--data-path=/var/lib/besu",
            "--rpc-http-enabled",
            "--rpc-http-host=0.0.0.0",
            "--rpc-http-cors-origins=*",
            "--host-allowlist=*",
            "--min-gas-price=0",
        ]),
        private_keys: strings(&BESU_DEV_KEYS),
    }
}

fn ganache_container() -> ContainerConfig {
    ContainerConfig {
        host: LOCALHOST.to_owned(),
        port: DEFAULT_RPC_PORT,
        image: "trufflesuite/ganache:latest".to_owned(),
        container_port: DEFAULT_RPC_PORT,
        runtime: "docker".to_owned(),
        container_name: None,
        data_mount: Some("/data".to_owned()),
        args: strings(&[
            "--wallet.deterministic",
            "--server.host",
            "0.0.0.0",
            "--database.dbPath",
            "/data",
        ]),
        private_keys: strings(&GANACHE_DETERMINISTIC_KEYS),
    }
}

fn ganache_gui() -> ExternalConfig {
    ExternalConfig {
        host: LOCALHOST.to_owned(),
        port: GANACHE_GUI_PORT,
        probe: true,
        // The desktop app generates a fresh wallet per workspace.
        private_keys: Vec::new(),
    }
}

fn pricom() -> ExternalConfig {
    ExternalConfig {
        host: LOCALHOST.to_owned(),
        port: DEFAULT_RPC_PORT,
        probe: true,
        private_keys: Vec::new(),
    }
}

fn tester() -> ExternalConfig {
    ExternalConfig {
        host: LOCALHOST.to_owned(),
        port: DEFAULT_RPC_PORT,
        probe: false,
        private_keys: strings(&GANACHE_DETERMINISTIC_KEYS),
    }
}

fn default_provider(id: ProviderId) -> ProviderConfig {
    match id {
        ProviderId::GanacheLocal => ProviderConfig::Local(ganache_local()),
        ProviderId::Besu => ProviderConfig::Container(besu()),
        ProviderId::Ganache => ProviderConfig::Container(ganache_container()),
        ProviderId::GanacheGui => ProviderConfig::External(ganache_gui()),
        ProviderId::Pricom => ProviderConfig::External(pricom()),
        ProviderId::Tester => ProviderConfig::External(tester()),
    }
}

impl Default for Config {
    fn default() -> Self {
        let providers: BTreeMap<String, ProviderConfig> = ProviderId::ALL
            .into_iter()
            .map(|id| (id.as_str().to_owned(), default_provider(id)))
            .collect();
        Self {
            general: GeneralConfig::default(),
            logging: LoggingConfig::default(),
            providers,
        }
    }
}
