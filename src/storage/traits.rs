use std::sync::Arc;

use async_trait::async_trait;

use super::error::StorageError;
use crate::domain::AggregateSnapshot;

/// One tier of the snapshot cache
///
/// Backends are queried in order by [`TieredCache`](super::TieredCache);
/// every snapshot a backend hands out is flagged as a cache hit.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Return the cached snapshot, `Ok(None)` on a miss
    async fn load(&self) -> Result<Option<Arc<AggregateSnapshot>>, StorageError>;

    /// Replace the cached snapshot
    async fn store(&self, snapshot: Arc<AggregateSnapshot>) -> Result<(), StorageError>;

    /// Drop whatever this tier holds
    async fn invalidate(&self) -> Result<(), StorageError>;
}

/// Point-in-time reading of process memory usage
pub trait MemoryProbe: Send + Sync {
    /// Bytes currently in use, `None` if the reading is unavailable
    fn used_bytes(&self) -> Option<u64>;

    /// Reading in MiB, for stats and logs
    fn used_mb(&self) -> Option<f64> {
        self.used_bytes().map(|b| b as f64 / (1024.0 * 1024.0))
    }
}
