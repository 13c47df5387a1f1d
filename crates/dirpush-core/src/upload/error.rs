//! Upload error type for failure classification.

use std::fmt;

/// Why a single upload did not succeed. Converted to `UploadOutcome::Failure`
/// at the worker boundary; never propagated out of a batch.
#[derive(Debug)]
pub enum UploadError {
    /// The file could not be opened (vanished, permissions).
    Open(std::io::Error),
    /// Reading the file failed mid-transfer.
    Read(std::io::Error),
    /// Curl reported an error (timeout, connection refused, etc.).
    Curl(curl::Error),
    /// Response had a non-2xx status.
    Http(u32),
    /// The blocking upload task panicked or was cancelled.
    Worker(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Open(e) => write!(f, "open: {}", e),
            UploadError::Read(e) => write!(f, "read: {}", e),
            UploadError::Curl(e) => write!(f, "{}", e),
            UploadError::Http(code) => write!(f, "HTTP {}", code),
            UploadError::Worker(msg) => write!(f, "upload worker: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Open(e) | UploadError::Read(e) => Some(e),
            UploadError::Curl(e) => Some(e),
            UploadError::Http(_) | UploadError::Worker(_) => None,
        }
    }
}

impl From<curl::Error> for UploadError {
    fn from(e: curl::Error) -> Self {
        UploadError::Curl(e)
    }
}
