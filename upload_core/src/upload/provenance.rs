//! Checks that a temp path was produced by the upload mechanism itself.
//!
//! A descriptor's temp path is just data; a tampered table could point it at
//! any file on the host. Both implementations here resolve symlinks and `..`
//! before deciding, so a path that merely names the upload directory is not
//! enough.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::descriptor::FileTable;

pub trait UploadProvenance: Send + Sync {
    fn is_uploaded_file(&self, path: &Path) -> bool;
}

impl<T: UploadProvenance + ?Sized> UploadProvenance for &T {
    fn is_uploaded_file(&self, path: &Path) -> bool {
        (**self).is_uploaded_file(path)
    }
}

impl<T: UploadProvenance + ?Sized> UploadProvenance for std::sync::Arc<T> {
    fn is_uploaded_file(&self, path: &Path) -> bool {
        (**self).is_uploaded_file(path)
    }
}

/// Accepts nothing. For callers that have no upload mechanism of their own
/// to vouch for a path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllProvenance;

impl UploadProvenance for DenyAllProvenance {
    fn is_uploaded_file(&self, _path: &Path) -> bool {
        false
    }
}

/// Accepts regular files strictly inside a framework-managed directory.
#[derive(Debug, Clone)]
pub struct TempDirProvenance {
    root: PathBuf,
}

impl TempDirProvenance {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl UploadProvenance for TempDirProvenance {
    fn is_uploaded_file(&self, path: &Path) -> bool {
        let Ok(resolved) = path.canonicalize() else {
            return false;
        };

        let inside = resolved != self.root && resolved.starts_with(&self.root);
        if !inside {
            tracing::debug!(path = %path.display(), root = %self.root.display(), "temp path outside upload directory");
            return false;
        }

        fs::metadata(&resolved).map(|m| m.is_file()).unwrap_or(false)
    }
}

/// Host-side staging area that received file parts are written into.
///
/// Every staged path is recorded; only recorded paths that still exist pass
/// the provenance check. The backing directory is removed on drop.
pub struct UploadStaging {
    _dir: TempDir,
    root: PathBuf,
    issued: Mutex<HashSet<PathBuf>>,
}

impl UploadStaging {
    pub fn new() -> io::Result<Self> {
        Self::from_dir(tempfile::Builder::new().prefix("uploads-").tempdir()?)
    }

    /// Creates the staging directory under `parent`, creating `parent` first
    /// if needed.
    pub fn new_in(parent: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(parent.as_ref())?;
        Self::from_dir(tempfile::Builder::new().prefix("uploads-").tempdir_in(parent)?)
    }

    fn from_dir(dir: TempDir) -> io::Result<Self> {
        let root = dir.path().canonicalize()?;
        tracing::debug!(root = %root.display(), "upload staging directory ready");

        Ok(Self {
            _dir: dir,
            root,
            issued: Mutex::new(HashSet::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates an empty staged file and records its path.
    pub fn stage(&self) -> io::Result<(fs::File, PathBuf)> {
        let (file, path) = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.root)?
            .keep()
            .map_err(|e| e.error)?;

        self.issued.lock().insert(path.clone());
        Ok((file, path))
    }

    pub fn staged_count(&self) -> usize {
        self.issued.lock().len()
    }

    /// Forgets and deletes one staged file. Returns whether the path had been
    /// issued by this staging area.
    pub fn discard(&self, path: &Path) -> bool {
        let was_issued = self.issued.lock().remove(path);
        if !was_issued {
            return false;
        }

        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove staged upload");
            }
        }
        true
    }

    pub fn discard_table(&self, table: &FileTable) -> usize {
        table
            .iter()
            .filter_map(|(_, descriptor)| descriptor.temp_path())
            .filter(|path| self.discard(path))
            .count()
    }
}

impl UploadProvenance for UploadStaging {
    fn is_uploaded_file(&self, path: &Path) -> bool {
        let Ok(resolved) = path.canonicalize() else {
            return false;
        };

        if !self.issued.lock().contains(&resolved) {
            tracing::debug!(path = %path.display(), "temp path was not issued by the staging area");
            return false;
        }

        fs::metadata(&resolved).map(|m| m.is_file()).unwrap_or(false)
    }
}

impl std::fmt::Debug for UploadStaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadStaging")
            .field("root", &self.root)
            .field("staged", &self.staged_count())
            .finish()
    }
}
