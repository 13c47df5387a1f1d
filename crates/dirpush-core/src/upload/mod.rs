//! Upload worker: stream one file as the body of an HTTP POST.
//!
//! Uses the curl crate (libcurl) with a read callback so the file is never
//! held in memory whole. Every failure (open, read, transport, timeout,
//! non-2xx status) is folded into [`UploadOutcome::Failure`]; nothing here
//! returns an error that could abort a batch.

mod classify;
mod error;

pub use classify::{classify, classify_curl_error, classify_http_status, FailureKind};
pub use error::UploadError;

use crate::config::RunConfig;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const CONTENT_TYPE: &str = "application/json";
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Classified result of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success { status: u32 },
    Failure {
        path: PathBuf,
        reason: String,
        kind: FailureKind,
    },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    fn failure(path: &Path, err: &UploadError) -> Self {
        UploadOutcome::Failure {
            path: path.to_path_buf(),
            reason: err.to_string(),
            kind: classify(err),
        }
    }
}

/// Per-run request parameters shared by all uploads.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Full target URL including the `labels` query.
    pub url: String,
    pub timeout: Duration,
}

impl UploadRequest {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            url: cfg.upload_url().to_string(),
            timeout: cfg.timeout,
        }
    }
}

/// POST the contents of `path` to `request.url`. Returns the HTTP status on 2xx.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn upload_file(path: &Path, request: &UploadRequest) -> Result<u32, UploadError> {
    let mut file = File::open(path).map_err(UploadError::Open)?;
    let body_len = file.metadata().map(|m| m.len()).ok();
    let mut read_error: Option<std::io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(&request.url)?;
    easy.post(true)?;
    if let Some(len) = body_len {
        easy.post_field_size(len)?;
    }
    easy.connect_timeout(request.timeout.min(MAX_CONNECT_TIMEOUT))?;
    easy.timeout(request.timeout)?;

    let mut list = curl::easy::List::new();
    list.append(&format!("Content-Type: {}", CONTENT_TYPE))?;
    // Send the body immediately instead of waiting on 100-continue.
    list.append("Expect:")?;
    easy.http_headers(list)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.read_function(|buf| match file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                read_error = Some(e);
                Err(curl::easy::ReadError::Abort)
            }
        })?;
        // Response body is not inspected.
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if let Some(io_err) = read_error {
            return Err(UploadError::Read(io_err));
        }
        return Err(UploadError::Curl(e));
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(UploadError::Http(code));
    }
    Ok(code)
}

/// Async wrapper around [`upload_file`]: runs the blocking transfer on tokio's
/// blocking pool and converts every error into an outcome.
pub async fn upload(path: PathBuf, request: Arc<UploadRequest>) -> UploadOutcome {
    let task_path = path.clone();
    let joined =
        tokio::task::spawn_blocking(move || upload_file(&task_path, &request)).await;
    match joined {
        Ok(Ok(status)) => UploadOutcome::Success { status },
        Ok(Err(e)) => UploadOutcome::failure(&path, &e),
        Err(join_err) => UploadOutcome::failure(&path, &UploadError::Worker(join_err.to_string())),
    }
}
