use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use alloy_genesis::GenesisAccount;
use alloy_primitives::Address;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{account::AccountRecord, errors::ProvisionError};

/// Genesis `alloc` map of the provisioned accounts.
pub type AccountAlloc = BTreeMap<Address, GenesisAccount>;

pub fn alloc_for(accounts: &[AccountRecord]) -> AccountAlloc {
    accounts
        .iter()
        .map(|a| (a.address(), GenesisAccount::default().with_balance(a.balance)))
        .collect()
}

/// Persisted address and balance list. The first real start funds each role
/// account with the balance recorded here.
#[derive(Clone, Debug)]
pub struct AccountArtifact {
    path: PathBuf,
}

impl AccountArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn write(&self, accounts: &[AccountRecord]) -> Result<(), ProvisionError> {
        let alloc = alloc_for(accounts);
        let json = serde_json::to_vec_pretty(&alloc).map_err(|source| {
            ProvisionError::ArtifactFormat {
                path: self.path.clone(),
                source,
            }
        })?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(ProvisionError::io(dir))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(ProvisionError::io(dir))?;
        tmp.write_all(&json).map_err(ProvisionError::io(dir))?;
        tmp.persist(&self.path)
            .map_err(|e| ProvisionError::io(&self.path)(e.error))?;

        debug!(path = ?self.path, accounts = alloc.len(), "wrote account artifact");
        Ok(())
    }

    pub fn read(&self) -> Result<AccountAlloc, ProvisionError> {
        let raw = fs::read(&self.path).map_err(ProvisionError::io(&self.path))?;
        serde_json::from_slice(&raw).map_err(|source| ProvisionError::ArtifactFormat {
            path: self.path.clone(),
            source,
        })
    }
}
