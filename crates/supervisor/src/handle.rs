use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::{errors::SupervisorError, proc};

/// Cross-invocation record of a supervised process.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProcessHandle {
    pub pid: u32,

    /// Kernel start time, used to tell the recorded process from a later one
    /// that reused its pid.
    pub start_time: Option<u64>,

    pub program: String,

    /// Unix seconds at which the handle was written.
    pub started_at: u64,
}

impl ProcessHandle {
    /// Fingerprints a running process.
    pub fn capture(pid: u32, program: impl Into<String>) -> Self {
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            pid,
            start_time: proc::start_time(pid),
            program: program.into(),
            started_at,
        }
    }

    pub fn is_alive(&self) -> bool {
        proc::is_alive(self.pid, self.start_time)
    }
}

/// The file a [`ProcessHandle`] is persisted in.
#[derive(Clone, Debug)]
pub struct HandleFile {
    path: PathBuf,
}

impl HandleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the handle.
    ///
    /// An unreadable handle cannot identify anything, so it is removed and
    /// reported as absent.
    pub fn load(&self) -> Result<Option<ProcessHandle>, SupervisorError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SupervisorError::io(&self.path)(e)),
        };
        match serde_json::from_str::<ProcessHandle>(&raw) {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                warn!(path = ?self.path, %e, "discarding unreadable process handle");
                self.remove()?;
                Ok(None)
            }
        }
    }

    pub fn store(&self, handle: &ProcessHandle) -> Result<(), SupervisorError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(SupervisorError::io(dir))?;

        let json = serde_json::to_vec_pretty(handle).map_err(SupervisorError::HandleEncode)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(SupervisorError::io(dir))?;
        tmp.write_all(&json).map_err(SupervisorError::io(dir))?;
        tmp.persist(&self.path)
            .map_err(|e| SupervisorError::io(&self.path)(e.error))?;
        Ok(())
    }

    /// Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool, SupervisorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SupervisorError::io(&self.path)(e)),
        }
    }
}
