//! Writing the artifact triple to disk.
//!
//! Each document is first written to a temporary file next to its
//! destination. Existing destinations are moved aside before any temporary
//! is renamed into place. If a rename fails, the documents already renamed
//! are removed and the moved-aside files are restored, so a failed write
//! leaves every destination as it was.

use std::io::Write;
use std::path::{Path, PathBuf};

use snafu::ResultExt;
use tempfile::{NamedTempFile, TempPath};

use crate::types::Artifacts;
use crate::{IoSnafu, PersistSnafu, Result};

/// Destinations of the three generated documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub implementation: PathBuf,
    pub header: PathBuf,
    pub unittest: PathBuf,
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn stage(path: &Path, contents: &str) -> Result<NamedTempFile> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir).context(IoSnafu { path })?;

    let mut file = NamedTempFile::new_in(dir).context(IoSnafu { path })?;
    file.write_all(contents.as_bytes()).context(IoSnafu { path })?;
    file.flush().context(IoSnafu { path })?;
    Ok(file)
}

/// Move an existing destination file to a temporary path in the same directory.
fn set_aside(path: &Path) -> Result<Option<TempPath>> {
    if !path.is_file() {
        return Ok(None);
    }
    let backup = NamedTempFile::new_in(parent_dir(path)).context(IoSnafu { path })?.into_temp_path();
    std::fs::rename(path, &backup).context(IoSnafu { path })?;
    Ok(Some(backup))
}

fn roll_back(written: &[&Path], backups: Vec<(&Path, TempPath)>) {
    for path in written {
        if let Err(err) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove partially written artifact");
        }
    }
    for (path, backup) in backups {
        if let Err(err) = backup.persist(path) {
            tracing::warn!(path = %path.display(), error = %err.error, "failed to restore previous artifact");
        }
    }
}

impl Artifacts {
    /// Write all three documents, or none of them.
    ///
    /// Directories on the way to each destination are created. On failure
    /// the destinations keep their previous contents, or stay absent.
    pub fn write(&self, paths: &ArtifactPaths) -> Result<()> {
        let documents = [
            (paths.implementation.as_path(), &self.implementation),
            (paths.header.as_path(), &self.header),
            (paths.unittest.as_path(), &self.unittest),
        ];

        let mut staged = Vec::with_capacity(documents.len());
        for (path, contents) in documents {
            staged.push((path, stage(path, contents)?));
        }

        let mut backups = Vec::with_capacity(staged.len());
        for &(path, _) in &staged {
            match set_aside(path) {
                Ok(Some(backup)) => backups.push((path, backup)),
                Ok(None) => {}
                Err(err) => {
                    roll_back(&[], backups);
                    return Err(err);
                }
            }
        }

        let mut written = Vec::with_capacity(staged.len());
        for (path, file) in staged {
            if let Err(err) = file.persist(path).context(PersistSnafu { path }) {
                roll_back(&written, backups);
                return Err(err);
            }
            written.push(path);
            tracing::debug!(path = %path.display(), "artifact written");
        }
        Ok(())
    }
}
