//! Per-file progress events and the end-of-run summary.
//!
//! Events are streamed to the CLI as each upload settles; the summary is
//! returned by the coordinator once the last batch has drained.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::upload::{FailureKind, UploadOutcome};

/// One settled upload, in the order uploads finish (not enumeration order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    /// 1-based index of the batch this file belonged to.
    pub batch: usize,
    pub path: PathBuf,
    pub outcome: UploadOutcome,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of batches processed.
    pub batches: usize,
    /// Files whose upload settled (success + failed).
    pub files: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// Failure counts per kind.
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    /// Failed uploads whose path did not make it into the error log.
    pub unrecorded_failures: usize,
    pub elapsed_secs: f64,
    /// Where failed paths were appended.
    pub error_log: PathBuf,
}

impl RunSummary {
    pub(super) fn new(error_log: PathBuf) -> Self {
        Self {
            error_log,
            ..Self::default()
        }
    }

    pub(super) fn record(&mut self, outcome: &UploadOutcome) {
        self.files += 1;
        match outcome {
            UploadOutcome::Success { .. } => self.uploaded += 1,
            UploadOutcome::Failure { kind, .. } => {
                self.failed += 1;
                *self.failures_by_kind.entry(*kind).or_insert(0) += 1;
            }
        }
    }

    /// Settled uploads per second (0 if elapsed is 0).
    pub fn files_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.files as f64 / self.elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(kind: FailureKind) -> UploadOutcome {
        UploadOutcome::Failure {
            path: PathBuf::from("x.json"),
            reason: "r".into(),
            kind,
        }
    }

    #[test]
    fn record_tallies_outcomes() {
        let mut s = RunSummary::new(PathBuf::from("errors.log"));
        s.record(&UploadOutcome::Success { status: 201 });
        s.record(&failure(FailureKind::Timeout));
        s.record(&failure(FailureKind::Timeout));
        s.record(&failure(FailureKind::Server));
        assert_eq!(s.files, 4);
        assert_eq!(s.uploaded, 1);
        assert_eq!(s.failed, 3);
        assert_eq!(s.failures_by_kind[&FailureKind::Timeout], 2);
        assert_eq!(s.failures_by_kind[&FailureKind::Server], 1);
    }

    #[test]
    fn files_per_sec_handles_zero_elapsed() {
        let mut s = RunSummary::new(PathBuf::new());
        s.files = 10;
        assert_eq!(s.files_per_sec(), 0.0);
        s.elapsed_secs = 2.0;
        assert!((s.files_per_sec() - 5.0).abs() < 1e-9);
    }
}
