//! core::lock
//!
//! Exclusive lock over one working tree.
//!
//! Both protocols assume they are the only writer of the working tree, its
//! index and the branch HEAD follows. The CLI holds a [`WorktreeLock`] for
//! the whole of each protocol call so that a second `confpatch` process
//! fails fast instead of interleaving commits.
//!
//! # Invariants
//!
//! - Acquisition is non-blocking
//! - The lock is released on drop
//! - The lock lives under the per-worktree git dir

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use super::paths::ConfpatchPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("working tree is locked by another confpatch process ({path})")]
    AlreadyLocked { path: PathBuf },

    #[error("failed to create lock {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to acquire lock {path}: {source}")]
    AcquireFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// RAII guard for the worktree lock.
#[derive(Debug)]
pub struct WorktreeLock {
    path: PathBuf,
    file: Option<File>,
}

impl WorktreeLock {
    /// Acquire the lock, failing immediately if another process holds it.
    pub fn acquire(paths: &ConfpatchPaths) -> Result<Self, LockError> {
        let dir = paths.worktree_dir();
        fs::create_dir_all(&dir).map_err(|source| LockError::CreateFailed {
            path: dir.clone(),
            source,
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::CreateFailed {
                path: path.clone(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(lock = %path.display(), "acquired worktree lock");
                Ok(Self {
                    path,
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked { path })
            }
            Err(source) => Err(LockError::AcquireFailed { path, source }),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorktreeLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
