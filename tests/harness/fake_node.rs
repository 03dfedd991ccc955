use std::{
    fs, io,
    net::TcpListener,
    path::{Path, PathBuf},
};

use provctl_config::{LocalNodeConfig, DEV_MNEMONIC};
use tempfile::TempDir;

/// Addresses of the deterministic dev keys, in role order.
pub const KNOWN_ADDRESSES: [&str; 3] = [
    "0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1",
    "0xFFcf8FDEE72ac11b5c542428B35EEF5769C409f0",
    "0x22d491Bde2303f2f43325b2108D26f1eAbA1e32b",
];

/// The `fake-node` binary wired up as a local provider.
///
/// Every run appends its argument line to an invocation log before it binds
/// the RPC port, so once the controller sees the port served the line is
/// already there.
#[derive(Debug)]
pub struct FakeNode {
    program: PathBuf,
    dir: TempDir,
    port: u16,
}

impl FakeNode {
    /// `program` is the built `fake-node` binary, `CARGO_BIN_EXE_fake-node`
    /// in integration tests.
    pub fn new(program: impl AsRef<Path>) -> io::Result<Self> {
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        Ok(Self {
            program: program.as_ref().to_path_buf(),
            dir: tempfile::tempdir()?,
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn invocation_log(&self) -> PathBuf {
        self.dir.path().join("invocations")
    }

    /// Argument lines of every run so far, oldest first.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.invocation_log())
            .map(|s| s.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Local node config running this binary, with the built-in funded
    /// account arguments on first start.
    pub fn config(&self) -> LocalNodeConfig {
        let record = self.invocation_log().display().to_string();
        let args = |extra: &[&str]| {
            let mut args = vec!["--record".to_owned(), record.clone()];
            args.extend(extra.iter().map(|s| (*s).to_owned()));
            args
        };
        let mut first_start_args = Vec::new();
        for placeholder in ["{alice_account}", "{bob_account}", "{carol_account}"] {
            first_start_args.push("--wallet.accounts".to_owned());
            first_start_args.push(placeholder.to_owned());
        }
        LocalNodeConfig {
            host: "127.0.0.1".to_owned(),
            port: self.port,
            network_id: 1337,
            command: self.program.display().to_string(),
            mnemonic: DEV_MNEMONIC.to_owned(),
            args: args(&["--port", "{port}", "--db", "{chain_dir}"]),
            provision_args: args(&["--provision", "--port", "{port}", "--db", "{chain_dir}"]),
            first_start_args,
        }
    }
}
