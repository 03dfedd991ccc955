use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{errors::EnvStoreError, record::EnvRecord};

const HEADER: &str = "# Generated by provctl init. Do not edit by hand.\n";

/// File-backed [`EnvRecord`].
#[derive(Clone, Debug)]
pub struct EnvironmentStore {
    path: PathBuf,
}

impl EnvironmentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the record, returning an empty one when the file is absent.
    pub fn load(&self) -> Result<EnvRecord, EnvStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => EnvRecord::parse(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EnvRecord::new()),
            Err(e) => Err(EnvStoreError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Replaces the record on disk.
    ///
    /// The new contents are written to a sibling temp file and renamed over
    /// the old one, so readers see either the previous record or the new one.
    pub fn save(&self, record: &EnvRecord) -> Result<(), EnvStoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(EnvStoreError::io(dir))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(EnvStoreError::io(dir))?;
        let tmp_path = tmp.path().to_owned();
        write_contents(&mut tmp, record).map_err(EnvStoreError::io(tmp_path))?;
        tmp.persist(&self.path)
            .map_err(|e| EnvStoreError::io(&self.path)(e.error))?;

        debug!(path = ?self.path, keys = record.len(), "saved environment record");
        Ok(())
    }

    /// Removes the file. Returns whether there was anything to remove.
    pub fn clear(&self) -> Result<bool, EnvStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EnvStoreError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

fn write_contents(tmp: &mut NamedTempFile, record: &EnvRecord) -> io::Result<()> {
    tmp.write_all(HEADER.as_bytes())?;
    tmp.write_all(record.render().as_bytes())?;
    tmp.as_file().sync_all()
}
