use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::reader::Chunk;
use crate::domain::Record;
use crate::io::parse_row;

/// Row errors logged per chunk before going quiet
const LOGGED_ROW_ERRORS: usize = 5;

/// Parsed records of one chunk
#[derive(Debug)]
pub struct ChunkResult {
    pub index: usize,
    pub records: Vec<Record>,
    pub row_errors: usize,
}

/// Outcome of the whole pool once every worker has returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub workers: usize,
    pub chunks_processed: usize,
    /// Workers that panicked; the chunk each was holding is lost
    pub failed_workers: usize,
}

/// Parse every row of a chunk, counting failures instead of stopping
pub fn process_chunk(chunk: Chunk, worker_id: usize) -> ChunkResult {
    let mut records = Vec::with_capacity(chunk.rows.len());
    let mut row_errors = 0;

    for (offset, row) in chunk.rows.iter().enumerate() {
        match parse_row(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                row_errors += 1;
                if row_errors <= LOGGED_ROW_ERRORS {
                    debug!(
                        worker_id,
                        chunk_index = chunk.index,
                        row = offset,
                        error = %e,
                        "Skipping invalid row"
                    );
                }
            }
        }
    }

    ChunkResult {
        index: chunk.index,
        records,
        row_errors,
    }
}

/// Fixed set of parser tasks sharing one chunk channel
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Pool of `requested` workers, capped to the available parallelism
    pub fn new(requested: usize) -> Self {
        let cores = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self {
            workers: requested.clamp(1, cores),
        }
    }

    pub fn size(&self) -> usize {
        self.workers
    }

    /// Start the workers and a supervisor that joins them
    ///
    /// Each worker owns a clone of `results`, so the results channel closes
    /// once the last worker returns.
    pub fn spawn(
        &self,
        chunks: mpsc::Receiver<Chunk>,
        results: mpsc::Sender<ChunkResult>,
        cancel: CancellationToken,
    ) -> JoinHandle<PoolSummary> {
        let shared = Arc::new(Mutex::new(chunks));
        let mut set = JoinSet::new();

        for worker_id in 0..self.workers {
            set.spawn(work(
                worker_id,
                Arc::clone(&shared),
                results.clone(),
                cancel.clone(),
            ));
        }
        drop(results);

        let workers = self.workers;
        tokio::spawn(async move {
            let mut summary = PoolSummary {
                workers,
                ..PoolSummary::default()
            };

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(processed) => summary.chunks_processed += processed,
                    Err(e) => {
                        error!(error = %e, "Worker task failed");
                        summary.failed_workers += 1;
                    }
                }
            }
            summary
        })
    }
}

async fn work(
    worker_id: usize,
    chunks: Arc<Mutex<mpsc::Receiver<Chunk>>>,
    results: mpsc::Sender<ChunkResult>,
    cancel: CancellationToken,
) -> usize {
    let mut processed = 0;

    loop {
        let next = {
            let mut rx = chunks.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                chunk = rx.recv() => chunk,
            }
        };
        let Some(chunk) = next else { break };

        let result = process_chunk(chunk, worker_id);
        if results.send(result).await.is_err() {
            break;
        }
        processed += 1;
    }

    debug!(worker_id, processed, "Worker finished");
    processed
}
