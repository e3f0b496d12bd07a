use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

const STAGING_PREFIX: &str = "pdf-split-";

/// Per-run working directory. The directory name is random, never taken from
/// the upload, and the whole tree is removed on `close` or when dropped.
pub struct StagingDir {
    dir: Option<TempDir>,
    files: Vec<PathBuf>,
}

impl StagingDir {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
        debug!("Staging in {}", dir.path().display());
        Ok(Self {
            dir: Some(dir),
            files: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        // Only `close` takes the directory, and it consumes `self`.
        self.dir.as_ref().map(TempDir::path).unwrap_or(Path::new(""))
    }

    /// Write `bytes` to a file named `name` directly inside the directory.
    pub fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid staged file name: {:?}", name),
            ));
        }

        let path = self.path().join(name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        io::Write::write_all(&mut file, bytes)?;
        self.files.push(path.clone());
        Ok(path)
    }

    /// Staged files in the order they were written.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Remove the directory now, surfacing any error.
    pub fn close(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove staging dir {}: {}", path.display(), e);
            }
        }
    }
}
