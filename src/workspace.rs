//! Per-invocation execution workspace
//!
//! Each invocation owns a uniquely named directory under the configured temp
//! root holding the source file, the optional stdin file, and the build
//! output directory. The directory is removed on every exit path; removal
//! failures are logged and swallowed so they never mask the primary result.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::warn;

/// Monotonic component of workspace names. Combined with the process id and
/// tempfile's random suffix this keeps names collision-free under concurrent
/// invocations, unlike wall-clock derived naming.
static WORKSPACE_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `temp_root`.
    pub fn create(temp_root: &Path) -> Result<Self> {
        std::fs::create_dir_all(temp_root)
            .with_context(|| format!("failed to create temp root {:?}", temp_root))?;

        let seq = WORKSPACE_SEQ.fetch_add(1, Ordering::Relaxed);
        let prefix = format!("exec-{}-{}-", std::process::id(), seq);
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(temp_root)
            .context("failed to create execution workspace")?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory name, used to scope cgroup accounting for this invocation.
    pub fn name(&self) -> String {
        self.dir
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Write a file into the workspace and return its path.
    pub async fn write_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("failed to write {:?}", path))?;
        Ok(path)
    }

    /// Create (if needed) and return the build output directory.
    pub async fn build_dir(&self) -> Result<PathBuf> {
        let path = self.dir.path().join("build");
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("failed to create build dir {:?}", path))?;
        Ok(path)
    }

    /// Remove the workspace. Called on the normal return path; the `TempDir`
    /// drop covers panic and early-return paths.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("failed to remove workspace {:?}: {}", path, e);
        }
    }
}
