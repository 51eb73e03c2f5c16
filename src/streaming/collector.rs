use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::reader::ReadSummary;
use super::worker::ChunkResult;
use crate::domain::Record;
use crate::storage::MemoryProbe;

/// Counters describing one ingest run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    /// Data rows read from the source
    pub total_rows: usize,
    pub parsed_records: usize,
    /// Rows rejected by the CSV layer or the row parser
    pub row_errors: usize,
    /// Worker failures; each costs the rows of the chunk it held
    pub chunk_errors: usize,
    /// Chunk indices that never came back from the pool
    pub missing_chunks: Vec<usize>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub memory_usage_mb: Option<f64>,
    pub significant_loss: bool,
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

/// Ordered records plus the stats of the run that produced them
#[derive(Debug)]
pub struct Collected {
    pub records: Vec<Record>,
    pub stats: ProcessingStats,
}

/// Chunk results addressed by index, filled in completion order
#[derive(Debug, Default)]
pub struct ChunkSlots {
    slots: Vec<Option<ChunkResult>>,
    duplicates: usize,
}

impl ChunkSlots {
    pub fn insert(&mut self, result: ChunkResult) {
        let index = result.index;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }

        if self.slots[index].is_some() {
            warn!(chunk_index = index, "Duplicate chunk result ignored");
            self.duplicates += 1;
            return;
        }
        self.slots[index] = Some(result);
    }

    pub fn received(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Reassembles worker output into source order
pub struct Collector {
    loss_threshold: f64,
    probe: Option<Arc<dyn MemoryProbe>>,
}

impl Collector {
    pub fn new(loss_threshold: f64) -> Self {
        Self {
            loss_threshold,
            probe: None,
        }
    }

    /// Attach a memory probe whose reading is recorded in the stats
    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Buffer results until every worker has dropped its sender
    pub async fn drain(&self, mut results: mpsc::Receiver<ChunkResult>) -> ChunkSlots {
        let mut slots = ChunkSlots::default();
        while let Some(result) = results.recv().await {
            slots.insert(result);
        }
        slots
    }

    /// Concatenate chunks in index order and compute the run stats
    ///
    /// Missing indices are logged and skipped; the run carries on with
    /// whatever was reconstructed.
    pub fn finish(
        &self,
        slots: ChunkSlots,
        read: ReadSummary,
        failed_workers: usize,
        started: Instant,
    ) -> Collected {
        let ChunkSlots { mut slots, .. } = slots;
        if slots.len() < read.chunks {
            slots.resize_with(read.chunks, || None);
        }

        let capacity = slots.iter().flatten().map(|r| r.records.len()).sum();
        let mut records = Vec::with_capacity(capacity);
        let mut row_errors = read.read_errors;
        let mut missing_chunks = Vec::new();

        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(result) => {
                    row_errors += result.row_errors;
                    records.extend(result.records);
                }
                None if index < read.chunks => {
                    error!(chunk_index = index, "Chunk missing from results, its rows are lost");
                    missing_chunks.push(index);
                }
                None => {}
            }
        }

        let total_rows = read.rows;
        let parsed_records = records.len();
        let significant_loss =
            total_rows > 0 && (parsed_records as f64) < total_rows as f64 * self.loss_threshold;

        if significant_loss {
            error!(
                parsed = parsed_records,
                total = total_rows,
                threshold = self.loss_threshold,
                "Significant data loss detected"
            );
        }

        let stats = ProcessingStats {
            total_rows,
            parsed_records,
            row_errors,
            chunk_errors: failed_workers,
            missing_chunks,
            elapsed: started.elapsed(),
            memory_usage_mb: self.probe.as_ref().and_then(|p| p.used_mb()),
            significant_loss,
        };

        info!(
            total_rows,
            parsed_records,
            row_errors,
            missing_chunks = stats.missing_chunks.len(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Collected ingest results"
        );

        Collected { records, stats }
    }
}
