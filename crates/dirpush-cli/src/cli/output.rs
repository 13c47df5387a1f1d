//! Console lines for settled uploads and the final summary.

use dirpush_core::scheduler::{RunSummary, UploadEvent};
use dirpush_core::upload::UploadOutcome;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// `201 -> /data/b.json` or `Failed /data/a.json: <reason>`.
pub(super) fn format_event(event: &UploadEvent) -> String {
    match &event.outcome {
        UploadOutcome::Success { status } => {
            format!("{} -> {}", status, event.path.display())
        }
        UploadOutcome::Failure { reason, .. } => {
            format!("Failed {}: {}", event.path.display(), reason)
        }
    }
}

/// Print every event as it arrives until the coordinator drops its sender.
pub(super) fn spawn_printer(mut rx: mpsc::UnboundedReceiver<UploadEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", format_event(&event));
        }
    })
}

pub(super) fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Finished: {} uploaded, {} failed in {} batch(es) ({:.1}s, {:.1} files/s)",
        summary.uploaded,
        summary.failed,
        summary.batches,
        summary.elapsed_secs,
        summary.files_per_sec()
    )];
    if !summary.failures_by_kind.is_empty() {
        let kinds: Vec<String> = summary
            .failures_by_kind
            .iter()
            .map(|(kind, n)| format!("{}: {}", kind, n))
            .collect();
        lines.push(format!("Failures by kind: {}", kinds.join(", ")));
    }
    if summary.unrecorded_failures > 0 {
        lines.push(format!(
            "Warning: {} failed path(s) could not be written to the error log",
            summary.unrecorded_failures
        ));
    }
    lines.push(format!(
        "Failed uploads are recorded in {}",
        summary.error_log.display()
    ));
    lines
}
