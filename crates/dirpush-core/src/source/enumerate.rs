//! Lazy listing of the regular files directly inside a source directory.

use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

/// Source directory could not be opened. Fatal for the whole run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("permission denied opening source directory: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("source path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot read source directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => SourceError::DirectoryNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => SourceError::PermissionDenied(path.to_path_buf()),
            _ => SourceError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// One file to upload. Immutable; dropped once its upload settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    path: PathBuf,
}

impl UploadTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Iterator over the regular files of one directory, in listing order.
///
/// Directories, symlinks to directories and special files are skipped.
/// Entries that vanish or cannot be stat'ed mid-listing are logged and skipped.
pub struct SourceFiles {
    root: PathBuf,
    entries: ReadDir,
}

/// Open `dir` for listing. Fails only if the directory itself cannot be opened.
pub fn enumerate_files(dir: &Path) -> Result<SourceFiles, SourceError> {
    let meta = fs::metadata(dir).map_err(|e| SourceError::from_io(dir, e))?;
    if !meta.is_dir() {
        return Err(SourceError::NotADirectory(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|e| SourceError::from_io(dir, e))?;
    Ok(SourceFiles {
        root: dir.to_path_buf(),
        entries,
    })
}

impl Iterator for SourceFiles {
    type Item = UploadTarget;

    fn next(&mut self) -> Option<UploadTarget> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry in {}: {}", self.root.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            // fs::metadata follows symlinks: a link to a regular file is uploaded,
            // a link to a directory is not.
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => return Some(UploadTarget::new(path)),
                Ok(_) => tracing::trace!("skipping non-file {}", path.display()),
                Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
            }
        }
        None
    }
}
