//! Classify HTTP status and curl errors into failure kinds for reporting.

use super::error::UploadError;
use std::fmt;

/// Coarse failure bucket, tallied in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    /// Request exceeded the per-request timeout.
    Timeout,
    /// Could not connect, resolve, or the connection dropped.
    Connection,
    /// 4xx response.
    Client,
    /// 5xx response.
    Server,
    /// Any other non-2xx status (1xx/3xx).
    HttpStatus,
    /// Local file could not be opened or read.
    Io,
    /// The upload task itself failed.
    Worker,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connection => "connection",
            FailureKind::Client => "client error",
            FailureKind::Server => "server error",
            FailureKind::HttpStatus => "unexpected status",
            FailureKind::Io => "file i/o",
            FailureKind::Worker => "worker",
            FailureKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Classify a non-2xx HTTP status code.
pub fn classify_http_status(code: u32) -> FailureKind {
    match code {
        400..=499 => FailureKind::Client,
        500..=599 => FailureKind::Server,
        _ => FailureKind::HttpStatus,
    }
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_operation_timedout() {
        return FailureKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return FailureKind::Connection;
    }
    if e.is_read_error() || e.is_aborted_by_callback() {
        return FailureKind::Io;
    }
    FailureKind::Other
}

pub fn classify(e: &UploadError) -> FailureKind {
    match e {
        UploadError::Open(_) | UploadError::Read(_) => FailureKind::Io,
        UploadError::Curl(ce) => classify_curl_error(ce),
        UploadError::Http(code) => classify_http_status(*code),
        UploadError::Worker(_) => FailureKind::Worker,
    }
}
