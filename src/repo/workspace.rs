//! Ephemeral working-copy directory

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

/// Prefix of every workspace directory name
const WORKSPACE_PREFIX: &str = "submodule-sync-";

/// A uniquely named, initially empty directory owned by one run
///
/// The directory and everything cloned into it is deleted when the value is
/// dropped, so every exit path of the run (success, error, unwinding panic,
/// or the run future being dropped on interrupt) cleans up.
#[derive(Debug)]
pub struct EphemeralWorkspace {
    dir: TempDir,
}

impl EphemeralWorkspace {
    /// Create a fresh workspace under `base`, creating `base` if needed
    pub fn create(base: &Path) -> Result<Self> {
        fs::create_dir_all(base)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(base)?;

        // Guards against a name collision with leftovers from another run
        if let Err(err) = ensure_empty(dir.path()) {
            let _ = dir.keep();
            return Err(err);
        }

        debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    /// Root of the workspace
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the workspace now, reporting any error
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().display().to_string();
        self.dir.close()?;
        debug!(%path, "removed workspace");
        Ok(())
    }
}

/// Fail with [`Error::WorkspaceNotEmpty`] unless `path` is an empty directory
fn ensure_empty(path: &Path) -> Result<()> {
    if fs::read_dir(path)?.next().is_some() {
        return Err(Error::WorkspaceNotEmpty(path.display().to_string()));
    }
    Ok(())
}
