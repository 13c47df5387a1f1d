//! Append-only record of failed uploads, one path per line.
//!
//! The file is opened lazily on the first failure so a clean run never
//! creates it. Lines are written with a single `write_all` under a mutex on
//! an `O_APPEND` handle, so concurrent recorders never interleave.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Shared failure log. Safe to use from many tasks at once.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
    recorded: AtomicUsize,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
            recorded: AtomicUsize::new(0),
        }
    }

    /// Number of paths appended by this instance.
    pub fn recorded(&self) -> usize {
        self.recorded.load(Ordering::Relaxed)
    }

    /// Append `failed` and a newline, creating the log if absent.
    pub fn record(&self, failed: &Path) -> Result<()> {
        let mut line = failed.to_string_lossy().into_owned();
        line.push('\n');

        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .with_context(|| format!("open error log {}", self.path.display()))?;
            *guard = Some(file);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())
                .and_then(|()| file.flush())
                .with_context(|| format!("append to error log {}", self.path.display()))?;
        }
        self.recorded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
