use std::{
    fs, io,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
    process,
};

use provctl_primitives::ProviderId;
use tracing::{debug, info};

use crate::errors::WorkspaceError;

/// Outcome of [`WorkspaceSelector::select`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    /// The pointer now targets the requested provider.
    Changed { previous: Option<ProviderId> },
    /// The pointer already targeted it.
    Unchanged,
}

/// Maintains the workspace pointer over the per-provider state directories.
#[derive(Clone, Debug)]
pub struct WorkspaceSelector {
    providers_dir: PathBuf,
    pointer: PathBuf,
}

impl WorkspaceSelector {
    pub fn new(providers_dir: impl Into<PathBuf>, pointer: impl Into<PathBuf>) -> Self {
        Self {
            providers_dir: providers_dir.into(),
            pointer: pointer.into(),
        }
    }

    pub fn pointer(&self) -> &Path {
        &self.pointer
    }

    /// State directory of a provider, whether or not it exists.
    pub fn provider_dir(&self, id: ProviderId) -> PathBuf {
        self.providers_dir.join(id.as_str())
    }

    /// Creates the state directories for the given providers.
    ///
    /// Returns the directories that did not exist before.
    pub fn setup(
        &self,
        ids: impl IntoIterator<Item = ProviderId>,
    ) -> Result<Vec<PathBuf>, WorkspaceError> {
        let mut created = Vec::new();
        for id in ids {
            let dir = self.provider_dir(id);
            if dir.is_dir() {
                continue;
            }
            fs::create_dir_all(&dir).map_err(WorkspaceError::io(&dir))?;
            debug!(provider = %id, ?dir, "created provider state directory");
            created.push(dir);
        }
        Ok(created)
    }

    /// Points the workspace at `id`.
    ///
    /// The new link is created under a temporary name and renamed over the
    /// pointer, so concurrent readers always resolve either the old or the
    /// new provider.
    pub fn select(&self, id: ProviderId) -> Result<Selection, WorkspaceError> {
        let dir = self.provider_dir(id);
        if !dir.is_dir() {
            return Err(WorkspaceError::MissingProviderDir {
                provider: id,
                path: dir,
            });
        }

        let previous = self.current()?;
        if previous == Some(id) {
            debug!(provider = %id, "workspace already selected");
            return Ok(Selection::Unchanged);
        }

        let parent = self.pointer_parent();
        fs::create_dir_all(parent).map_err(WorkspaceError::io(parent))?;

        let tmp = parent.join(format!(".{}.{}.tmp", self.pointer_name(), process::id()));
        remove_if_exists(&tmp)?;
        symlink(self.link_target(id), &tmp).map_err(WorkspaceError::io(&tmp))?;
        if let Err(e) = fs::rename(&tmp, &self.pointer) {
            let _ = fs::remove_file(&tmp);
            return Err(WorkspaceError::io(&self.pointer)(e));
        }

        info!(provider = %id, ?previous, "selected provider");
        Ok(Selection::Changed { previous })
    }

    /// Provider the pointer currently targets, if any.
    pub fn current(&self) -> Result<Option<ProviderId>, WorkspaceError> {
        let target = match fs::read_link(&self.pointer) {
            Ok(target) => target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                return Err(WorkspaceError::NotASymlink {
                    path: self.pointer.clone(),
                })
            }
            Err(e) => return Err(WorkspaceError::io(&self.pointer)(e)),
        };

        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| WorkspaceError::UnknownTarget(target.display().to_string()))?;
        name.parse::<ProviderId>()
            .map(Some)
            .map_err(|_| WorkspaceError::UnknownTarget(name.to_owned()))
    }

    /// Active provider and its state directory.
    pub fn active(&self) -> Result<Option<(ProviderId, PathBuf)>, WorkspaceError> {
        Ok(self.current()?.map(|id| (id, self.provider_dir(id))))
    }

    fn pointer_parent(&self) -> &Path {
        self.pointer
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn pointer_name(&self) -> String {
        self.pointer
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_owned())
    }

    /// Relative target when the providers dir sits next to the pointer, so
    /// the base directory can be moved as a whole.
    fn link_target(&self, id: ProviderId) -> PathBuf {
        let siblings = self.providers_dir.parent() == Some(self.pointer_parent())
            || (self.providers_dir.parent() == Some(Path::new(""))
                && self.pointer_parent() == Path::new("."));
        match self.providers_dir.file_name() {
            Some(name) if siblings => Path::new(name).join(id.as_str()),
            _ => self.provider_dir(id),
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<(), WorkspaceError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WorkspaceError::io(path)(e)),
    }
}
