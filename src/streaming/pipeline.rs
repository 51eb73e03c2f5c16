use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::collector::{Collected, Collector};
use super::error::PipelineError;
use super::policy::{LogAndContinue, LossPolicy};
use super::reader::BatchReader;
use super::worker::WorkerPool;
use crate::io::open_source;
use crate::storage::MemoryProbe;

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 5;
pub const DEFAULT_LOSS_THRESHOLD: f64 = 0.95;

/// Reader, worker pool and collector wired together
///
/// One value can drive any number of runs; each run gets its own channels
/// and tasks.
///
/// # Example
/// ```rust,ignore
/// let collected = IngestPipeline::new()
///     .with_chunk_size(5_000)
///     .with_workers(4)
///     .run_file("data/raw/transactions.csv", CancellationToken::new())
///     .await?;
/// ```
pub struct IngestPipeline {
    chunk_size: usize,
    workers: usize,
    buffer_size: usize,
    channel_capacity: usize,
    loss_threshold: f64,
    policy: Arc<dyn LossPolicy>,
    probe: Option<Arc<dyn MemoryProbe>>,
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestPipeline {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            loss_threshold: DEFAULT_LOSS_THRESHOLD,
            policy: Arc::new(LogAndContinue),
            probe: None,
        }
    }

    /// Rows per chunk (minimum 1)
    pub fn with_chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows.max(1);
        self
    }

    /// Requested worker count, capped to the available parallelism
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Read buffer for file sources, in bytes
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes.max(1);
        self
    }

    /// Chunks allowed in flight before the reader waits
    pub fn with_channel_capacity(mut self, chunks: usize) -> Self {
        self.channel_capacity = chunks.max(1);
        self
    }

    /// Fraction of rows that must survive for a run to count as clean
    pub fn with_loss_threshold(mut self, threshold: f64) -> Self {
        self.loss_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn LossPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn loss_threshold(&self) -> f64 {
        self.loss_threshold
    }

    /// Open `path` and run the pipeline over it
    ///
    /// A missing or unreadable file fails here with
    /// [`PipelineError::SourceUnavailable`] before any task is spawned.
    pub async fn run_file(
        &self,
        path: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<Collected, PipelineError> {
        let path = path.as_ref();
        let source = open_source(path, self.buffer_size)
            .await
            .map_err(|source| PipelineError::SourceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), chunk_size = self.chunk_size, "Starting ingest");
        self.run(source, cancel).await
    }

    /// Run the pipeline over any async byte source with a header line
    ///
    /// Records come back in source order. A cancelled run returns
    /// [`PipelineError::Cancelled`] even if some chunks completed.
    pub async fn run<R>(&self, source: R, cancel: CancellationToken) -> Result<Collected, PipelineError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let started = Instant::now();
        let pool = WorkerPool::new(self.workers);

        let (chunk_tx, chunk_rx) = mpsc::channel(self.channel_capacity);
        let (result_tx, result_rx) = mpsc::channel(self.channel_capacity.max(pool.size()));
        let (done_tx, done_rx) = oneshot::channel();

        let reader = BatchReader::new(source, self.chunk_size);
        let reader_task = tokio::spawn(reader.run(chunk_tx, done_tx, cancel.clone()));
        let pool_task = pool.spawn(chunk_rx, result_tx, cancel.clone());

        let collector = self.collector();
        let slots = collector.drain(result_rx).await;

        let pool_summary = pool_task.await?;
        reader_task.await?;
        let read = done_rx.await.map_err(|_| PipelineError::ReaderVanished)?;

        if cancel.is_cancelled() {
            warn!(
                chunks_received = slots.received(),
                rows_read = read.rows,
                "Ingest cancelled, discarding partial results"
            );
            return Err(PipelineError::Cancelled);
        }

        let collected = collector.finish(slots, read, pool_summary.failed_workers, started);
        self.policy.check(&collected.stats, self.loss_threshold)?;
        Ok(collected)
    }

    fn collector(&self) -> Collector {
        let collector = Collector::new(self.loss_threshold);
        match &self.probe {
            Some(probe) => collector.with_memory_probe(Arc::clone(probe)),
            None => collector,
        }
    }
}
