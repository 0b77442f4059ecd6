//! Private on-disk area holding an EPUB's unpacked manifest items

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

const STAGING_PREFIX: &str = "folio_epub_";

/// Unpacked resources of one open EPUB. Removed when released or dropped;
/// removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct StagingDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl StagingDir {
    /// Create a fresh directory under the system temp dir
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
        let path = dir.path().to_path_buf();
        debug!("Created EPUB staging directory {path:?}");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `bytes` at `relative` inside the staging directory.
    ///
    /// Returns `Ok(None)` without writing when `relative` would land outside
    /// the directory.
    pub fn write(&self, relative: &Path, bytes: &[u8]) -> io::Result<Option<PathBuf>> {
        let Some(target) = contained_join(&self.path, relative) else {
            warn!("Skipping manifest item outside the archive root: {relative:?}");
            return Ok(None);
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        Ok(Some(target))
    }

    /// Remove the directory now
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!("Removed EPUB staging directory {:?}", self.path),
                Err(e) => warn!("Failed to remove staging directory {:?}: {e}", self.path),
            }
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Join `relative` onto `root`, refusing anything that climbs above `root`
/// or is absolute.
pub(crate) fn contained_join(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    let mut joined = root.to_path_buf();
    joined.extend(parts);
    Some(joined)
}
