use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::error::ServiceError;
use crate::domain::{AggregateSnapshot, Record};
use crate::engine::Aggregator;
use crate::streaming::{IngestPipeline, PipelineError, ProcessingStats};

/// Source of fresh snapshots for the service
#[async_trait]
pub trait SnapshotProducer: Send + Sync {
    async fn produce(&self, cancel: CancellationToken) -> Result<AggregateSnapshot, ServiceError>;
}

/// Snapshot plus the ingest stats behind it
#[derive(Debug)]
pub struct Produced {
    pub snapshot: AggregateSnapshot,
    pub stats: ProcessingStats,
}

/// Runs the ingest pipeline over a CSV file and aggregates the result
pub struct CsvSnapshotProducer {
    path: PathBuf,
    pipeline: IngestPipeline,
    aggregator: Aggregator,
}

impl CsvSnapshotProducer {
    pub fn new(path: impl Into<PathBuf>, pipeline: IngestPipeline) -> Self {
        Self {
            path: path.into(),
            pipeline,
            aggregator: Aggregator::new(),
        }
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full run returning the ingest stats alongside the snapshot
    ///
    /// `processing_time_ms` covers reading, parsing and aggregation.
    pub async fn produce_with_stats(&self, cancel: CancellationToken) -> Result<Produced, ServiceError> {
        let started = Instant::now();
        let collected = self.pipeline.run_file(&self.path, cancel.clone()).await?;
        let stats = collected.stats;

        let records: Arc<[Record]> = collected.records.into();
        let mut snapshot = self.aggregator.aggregate(records).await?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled.into());
        }

        snapshot.processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            path = %self.path.display(),
            records = snapshot.total_records,
            processing_time_ms = snapshot.processing_time_ms,
            "Snapshot produced"
        );
        Ok(Produced { snapshot, stats })
    }
}

#[async_trait]
impl SnapshotProducer for CsvSnapshotProducer {
    async fn produce(&self, cancel: CancellationToken) -> Result<AggregateSnapshot, ServiceError> {
        self.produce_with_stats(cancel).await.map(|p| p.snapshot)
    }
}
