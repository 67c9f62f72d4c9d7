//! Scratch directory for one run.
//!
//! The directory is created with a collision-resistant name and removed
//! exactly once: by [`TempDirManager::release`], or by `Drop` on any path that
//! skips the explicit release (error, interruption, panic unwinding).
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use uuid::Uuid;

use wgbs_model::TEMP_DIR_PREFIX;

use crate::error::{ExecError, ExecResult};

pub struct TempDirManager;

impl TempDirManager {
    /// Create a fresh directory under `preferred` if given and usable, else under `fallback`.
    ///
    /// Roots are not created; a missing or read-only root falls through to the next one.
    pub fn acquire(preferred: Option<&Path>, fallback: &Path) -> ExecResult<TempDirHandle> {
        let mut tried = Vec::new();
        for root in preferred.into_iter().chain(std::iter::once(fallback)) {
            match create_unique(root) {
                Ok(path) => {
                    debug!(target: "wgbs.exec.tempdir", path = %path.display(), "scratch directory created");
                    return Ok(TempDirHandle {
                        path,
                        released: false,
                    });
                }
                Err(e) => {
                    warn!(target: "wgbs.exec.tempdir", root = %root.display(), error = %e, "cannot create scratch directory");
                    tried.push(root.display().to_string());
                }
            }
        }
        Err(ExecError::TempDir {
            tried: tried.join(", "),
        })
    }

    /// Remove the directory now; see [`TempDirHandle::release`].
    pub fn release(mut handle: TempDirHandle) {
        handle.release();
    }
}

/// Owned scratch directory.
#[derive(Debug)]
pub struct TempDirHandle {
    path: PathBuf,
    released: bool,
}

impl TempDirHandle {
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Recursively remove the directory. Idempotent.
    ///
    /// Removal errors are logged and swallowed so they never mask the run's own status.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                debug!(target: "wgbs.exec.tempdir", path = %self.path.display(), "temp dir removed")
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(target: "wgbs.exec.tempdir", path = %self.path.display(), "temp dir already gone")
            }
            Err(e) => {
                warn!(target: "wgbs.exec.tempdir", path = %self.path.display(), error = %e, "failed to remove temp dir")
            }
        }
    }
}

impl Drop for TempDirHandle {
    fn drop(&mut self) {
        self.release();
    }
}

fn create_unique(root: &Path) -> io::Result<PathBuf> {
    let path = root.join(format!("{TEMP_DIR_PREFIX}{}", Uuid::new_v4().simple()));

    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(&path)?;
    Ok(path)
}
