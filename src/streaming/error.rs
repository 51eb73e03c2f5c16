use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinError;

use crate::io::IoError;

/// Failures that abort an ingest run
///
/// Row and chunk problems never show up here; they are tallied in
/// [`ProcessingStats`](super::ProcessingStats) instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("CSV source {path} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("Ingest run was cancelled")]
    Cancelled,

    #[error("Significant data loss: {parsed} of {total} rows parsed (threshold {threshold})")]
    DataLoss {
        parsed: usize,
        total: usize,
        threshold: f64,
    },

    #[error("Batch reader stopped without reporting completion")]
    ReaderVanished,

    #[error("Pipeline task failed: {0}")]
    TaskFailed(#[from] JoinError),
}
