//! Run coordinator: enumerate, batch, fan out through the limiter, wait, repeat.

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::config::RunConfig;
use crate::error_log::ErrorLog;
use crate::source::{enumerate_files, Batch, Batched};
use crate::upload::{self, FailureKind, UploadOutcome, UploadRequest};

use super::limiter::ConcurrencyLimiter;
use super::progress::{RunSummary, UploadEvent};

/// Coordinator lifecycle. `Failed` is reached only when the source directory
/// cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Enumerating,
    /// A full batch is in flight (1-based index).
    BatchInFlight(usize),
    /// The final, partial batch is in flight, or the source is exhausted.
    Draining,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Enumerating => write!(f, "enumerating"),
            RunState::BatchInFlight(n) => write!(f, "batch {} in flight", n),
            RunState::Draining => write!(f, "draining"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Owns a validated [`RunConfig`] for the duration of one run.
pub struct Coordinator {
    cfg: RunConfig,
    state: RunState,
    events: Option<mpsc::UnboundedSender<UploadEvent>>,
}

impl Coordinator {
    /// Validate `cfg` and build an idle coordinator. Fails fast on bad config.
    pub fn new(cfg: RunConfig) -> Result<Self> {
        cfg.validate().context("invalid run configuration")?;
        Ok(Self {
            cfg,
            state: RunState::Idle,
            events: None,
        })
    }

    /// Stream an [`UploadEvent`] for every settled upload to `tx`.
    ///
    /// Sending never waits, so a slow or idle receiver cannot hold a limiter
    /// slot. Undrained events stay queued until the receiver is dropped.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<UploadEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "run state");
        self.state = next;
    }

    /// Process every file of the source directory. Per-file failures are
    /// recorded and counted; only an unopenable source directory aborts.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::new(self.cfg.error_log.clone());

        self.transition(RunState::Enumerating);
        let files = match enumerate_files(&self.cfg.source_dir) {
            Ok(files) => files,
            Err(e) => {
                self.transition(RunState::Failed);
                return Err(e.into());
            }
        };
        tracing::info!(
            source = %self.cfg.source_dir.display(),
            endpoint = %self.cfg.endpoint,
            concurrency = self.cfg.concurrency,
            batch_size = self.cfg.batch_size,
            "upload run started"
        );

        let request = Arc::new(UploadRequest::from_config(&self.cfg));
        let error_log = Arc::new(ErrorLog::new(&self.cfg.error_log));
        let limiter = ConcurrencyLimiter::new(self.cfg.concurrency);

        for (index, batch) in files.batched(self.cfg.batch_size).enumerate() {
            let number = index + 1;
            if batch.len() < self.cfg.batch_size {
                self.transition(RunState::Draining);
            } else {
                self.transition(RunState::BatchInFlight(number));
            }
            self.run_batch(number, batch, &limiter, &request, &error_log, &mut summary)
                .await;
            summary.batches = number;
            if self.state != RunState::Draining {
                self.transition(RunState::Enumerating);
            }
        }
        if self.state != RunState::Draining {
            self.transition(RunState::Draining);
        }

        summary.unrecorded_failures = summary.failed.saturating_sub(error_log.recorded());
        summary.elapsed_secs = started.elapsed().as_secs_f64();
        self.transition(RunState::Done);
        tracing::info!(
            batches = summary.batches,
            uploaded = summary.uploaded,
            failed = summary.failed,
            elapsed_secs = summary.elapsed_secs,
            "upload run finished"
        );
        Ok(summary)
    }

    /// Submit every target of `batch` and wait until all of them have settled.
    async fn run_batch(
        &self,
        number: usize,
        batch: Batch,
        limiter: &ConcurrencyLimiter,
        request: &Arc<UploadRequest>,
        error_log: &Arc<ErrorLog>,
        summary: &mut RunSummary,
    ) {
        tracing::debug!(batch = number, files = batch.len(), "batch submitted");
        let handles: Vec<_> = batch
            .into_iter()
            .map(|target| {
                let path = target.into_path();
                let task = upload_and_record(
                    number,
                    path.clone(),
                    Arc::clone(request),
                    Arc::clone(error_log),
                    self.events.clone(),
                );
                (path, limiter.submit(task))
            })
            .collect();

        for (path, handle) in handles {
            let outcome = match handle.wait().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome = UploadOutcome::Failure {
                        path: path.clone(),
                        reason: format!("upload worker panicked: {}", e),
                        kind: FailureKind::Worker,
                    };
                    settle(number, path, outcome, error_log, self.events.as_ref()).await
                }
            };
            summary.record(&outcome);
        }
        tracing::debug!(batch = number, "batch settled");
    }
}

/// Task body run inside a limiter slot: upload, then record a failure.
async fn upload_and_record(
    batch: usize,
    path: PathBuf,
    request: Arc<UploadRequest>,
    error_log: Arc<ErrorLog>,
    events: Option<mpsc::UnboundedSender<UploadEvent>>,
) -> UploadOutcome {
    let outcome = upload::upload(path.clone(), request).await;
    settle(batch, path, outcome, &error_log, events.as_ref()).await
}

/// Log the outcome, append a failed path to the error log, and emit the event.
async fn settle(
    batch: usize,
    path: PathBuf,
    outcome: UploadOutcome,
    error_log: &Arc<ErrorLog>,
    events: Option<&mpsc::UnboundedSender<UploadEvent>>,
) -> UploadOutcome {
    match &outcome {
        UploadOutcome::Success { status } => {
            tracing::debug!(status, path = %path.display(), "uploaded");
        }
        UploadOutcome::Failure { reason, kind, .. } => {
            tracing::warn!(kind = %kind, path = %path.display(), "upload failed: {}", reason);
            record_failure(Arc::clone(error_log), path.clone()).await;
        }
    }
    if let Some(tx) = events {
        let event = UploadEvent {
            batch,
            path,
            outcome: outcome.clone(),
        };
        if tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
    outcome
}

/// Append `path` to the error log from the blocking pool.
async fn record_failure(error_log: Arc<ErrorLog>, path: PathBuf) {
    let joined = tokio::task::spawn_blocking(move || {
        error_log
            .record(&path)
            .map_err(|e| format!("could not record failure for {}: {:#}", path.display(), e))
    })
    .await;
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(msg)) => tracing::warn!("{}", msg),
        Err(e) => tracing::warn!("error log writer panicked: {}", e),
    }
}

/// Validate `cfg`, run it to completion, and stream events to `events` if given.
pub async fn run_upload(
    cfg: RunConfig,
    events: Option<mpsc::UnboundedSender<UploadEvent>>,
) -> Result<RunSummary> {
    let mut coordinator = Coordinator::new(cfg)?;
    if let Some(tx) = events {
        coordinator = coordinator.with_events(tx);
    }
    coordinator.run().await
}
