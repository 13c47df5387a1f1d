//! Source side of the pipeline: lazy directory listing and fixed-size batching.

mod batch;
mod enumerate;

pub use batch::{Batch, Batched, Batches};
pub use enumerate::{enumerate_files, SourceError, SourceFiles, UploadTarget};
