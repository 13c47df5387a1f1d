//! Run coordination.
//!
//! Drives the pipeline: source listing → batching → per-batch fan-out
//! through the concurrency limiter → upload worker → error log.
//! Batches run strictly one after another; only uploads within a batch overlap.

mod guard;
mod limiter;
mod progress;
mod run;

pub use limiter::{ConcurrencyLimiter, LimiterError, TaskHandle};
pub use progress::{RunSummary, UploadEvent};
pub use run::{run_upload, Coordinator, RunState};
