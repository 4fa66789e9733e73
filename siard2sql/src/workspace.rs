use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Substring that must appear in the realpath of a workspace before it may be deleted
/// recursively. Guards against a misconfigured teardown removing an unrelated tree.
pub const SAFETY_INFIX: &str = "_siard2sql_";

/// The per-run scratch directory housing extracted archive members.
///
/// Created under `TMPDIR` (default `/tmp`, created if missing) and removed recursively at the end
/// of the run, on both the success and the error path. Explicit [`Workspace::remove`] reports
/// removal errors; dropping the value cleans up silently.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace directory.
    pub fn create() -> crate::Result<Self> {
        let base = env::temp_dir();

        if !base.exists() {
            fs::create_dir_all(&base).map_err(|_| crate::Error::Workspace {
                path: base.clone(),
            })?;
        }

        let dir = tempfile::Builder::new()
            .prefix(SAFETY_INFIX)
            .tempdir_in(&base)
            .map_err(|_| crate::Error::Workspace { path: base })?;

        Ok(Workspace { dir })
    }

    /// The workspace root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A path inside the workspace.
    pub fn join<P: AsRef<Path>>(&self, rel: P) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Remove the workspace recursively.
    ///
    /// Refuses to delete a directory whose realpath does not contain [`SAFETY_INFIX`].
    pub fn remove(self) -> crate::Result<()> {
        let real = self
            .dir
            .path()
            .canonicalize()
            .unwrap_or_else(|_| self.dir.path().to_path_buf());

        if !real.to_string_lossy().contains(SAFETY_INFIX) {
            tracing::warn!(path = %real.display(), "refusing to remove a workspace without the safety infix");
            return Err(crate::Error::Workspace { path: real });
        }

        let path = real.clone();
        self.dir
            .close()
            .map_err(|_| crate::Error::Workspace { path })?;

        tracing::debug!(path = %real.display(), "workspace removed");
        Ok(())
    }
}
