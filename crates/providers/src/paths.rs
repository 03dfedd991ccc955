use std::{
    fs, io,
    path::{Path, PathBuf},
};

use provctl_env_store::EnvironmentStore;
use provctl_provision::AccountArtifact;
use provctl_supervisor::HandleFile;

use crate::errors::CleanupReport;

const ENVIRONMENT: &str = "environment";
const HANDLE: &str = "node.pid";
const MARKER: &str = "started.lock";
const ACCOUNTS: &str = "accounts.json";
const CHAIN_DIR: &str = "chaindata";
const NODE_LOG: &str = "node.log";

/// Files inside one provider's state directory.
#[derive(Clone, Debug)]
pub struct ProviderPaths {
    dir: PathBuf,
}

impl ProviderPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn environment(&self) -> PathBuf {
        self.dir.join(ENVIRONMENT)
    }

    pub fn handle(&self) -> PathBuf {
        self.dir.join(HANDLE)
    }

    pub fn marker(&self) -> PathBuf {
        self.dir.join(MARKER)
    }

    pub fn accounts(&self) -> PathBuf {
        self.dir.join(ACCOUNTS)
    }

    pub fn chain_dir(&self) -> PathBuf {
        self.dir.join(CHAIN_DIR)
    }

    pub fn node_log(&self) -> PathBuf {
        self.dir.join(NODE_LOG)
    }

    pub fn env_store(&self) -> EnvironmentStore {
        EnvironmentStore::new(self.environment())
    }

    pub fn artifact(&self) -> AccountArtifact {
        AccountArtifact::new(self.accounts())
    }

    pub fn handle_file(&self) -> HandleFile {
        HandleFile::new(self.handle())
    }

    pub fn has_marker(&self) -> bool {
        self.marker().is_file()
    }

    pub fn write_marker(&self) -> io::Result<()> {
        fs::write(self.marker(), b"")
    }

    pub fn remove_marker(&self) -> io::Result<bool> {
        remove_path(&self.marker())
    }

    pub fn remove_chain_dir(&self) -> io::Result<bool> {
        remove_path(&self.chain_dir())
    }

    /// Removes everything the provider owns except the directory itself.
    ///
    /// Each step runs regardless of earlier failures.
    pub fn discard(&self, report: &mut CleanupReport) {
        let steps: [(&'static str, PathBuf); 6] = [
            ("environment record", self.environment()),
            ("account artifact", self.accounts()),
            ("start marker", self.marker()),
            ("process handle", self.handle()),
            ("chain data", self.chain_dir()),
            ("node log", self.node_log()),
        ];
        for (step, path) in steps {
            match remove_path(&path) {
                Ok(true) => report.removed(step),
                Ok(false) => report.warn(step, format!("nothing to remove at {}", path.display())),
                Err(e) => report.fail(step, format!("failed to remove {}: {e}", path.display())),
            }
        }

        // Leftovers such as interrupted provisioning scratch dirs.
        let Ok(entries) = fs::read_dir(&self.dir) else {
            report.fail("state directory", format!("{} is unreadable", self.dir.display()));
            return;
        };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if let Err(e) = remove_path(&path) {
                report.fail("leftovers", format!("failed to remove {}: {e}", path.display()));
            }
        }
    }
}

/// Removes a file, symlink or directory tree. Returns whether it existed.
pub(crate) fn remove_path(path: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_on_empty_dir_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProviderPaths::new(dir.path());
        let mut report = CleanupReport::default();
        paths.discard(&mut report);
        assert!(report.removed.is_empty());
        assert_eq!(report.warnings.len(), 6);
        assert!(!report.has_failures());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_discard_removes_everything_but_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProviderPaths::new(dir.path());
        fs::write(paths.environment(), "A=1\n").unwrap();
        paths.write_marker().unwrap();
        fs::create_dir_all(paths.chain_dir().join("nested")).unwrap();
        fs::create_dir_all(dir.path().join(".provision-abc")).unwrap();

        let mut report = CleanupReport::default();
        paths.discard(&mut report);
        assert_eq!(
            report.removed,
            vec!["environment record", "start marker", "chain data"]
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_discard_reports_unremovable_files_as_failures() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProviderPaths::new(dir.path().join("ganache-local"));
        // A regular file where the state directory should be.
        fs::write(paths.dir(), "not a directory").unwrap();

        let mut report = CleanupReport::default();
        paths.discard(&mut report);
        assert!(report.removed.is_empty());
        assert!(report.has_failures());
        assert!(report.failures().any(|w| w.step == "state directory"), "{report:?}");
    }
}
