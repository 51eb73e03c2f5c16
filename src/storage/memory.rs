use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::StorageError;
use super::probe::ProcessMemory;
use super::traits::{CacheBackend, MemoryProbe};
use crate::domain::AggregateSnapshot;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 500 * 1024 * 1024;

#[derive(Debug)]
struct Slot {
    snapshot: Arc<AggregateSnapshot>,
    stored_at: Instant,
}

/// Single in-process snapshot slot with a TTL and a memory ceiling
///
/// Readers share the slot through an `RwLock`; a write swaps the whole
/// `Arc`, so a reader sees either the old snapshot or the new one.
pub struct MemoryCache {
    slot: RwLock<Option<Slot>>,
    ttl: Duration,
    max_memory_bytes: u64,
    probe: Arc<dyn MemoryProbe>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_memory_bytes: u64) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
            max_memory_bytes,
            probe: Arc::new(ProcessMemory::new()),
        }
    }

    /// Replace the process memory reading used for the ceiling check
    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    fn over_ceiling(&self) -> bool {
        self.probe
            .used_bytes()
            .is_some_and(|used| used > self.max_memory_bytes)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_MEMORY_BYTES)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<Arc<AggregateSnapshot>>, StorageError> {
        if self.over_ceiling() {
            if self.slot.write().await.take().is_some() {
                warn!(
                    max_memory_mb = self.max_memory_bytes / (1024 * 1024),
                    "Memory ceiling exceeded, evicted cached snapshot"
                );
            }
            return Ok(None);
        }

        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                Ok(Some(Arc::clone(&entry.snapshot)))
            }
            Some(entry) => {
                debug!(age_secs = entry.stored_at.elapsed().as_secs(), "Cached snapshot expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn store(&self, snapshot: Arc<AggregateSnapshot>) -> Result<(), StorageError> {
        if self.over_ceiling() {
            warn!("Memory ceiling exceeded, snapshot not cached in memory");
            return Ok(());
        }

        *self.slot.write().await = Some(Slot {
            snapshot: snapshot.as_cached(),
            stored_at: Instant::now(),
        });
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), StorageError> {
        self.slot.write().await.take();
        Ok(())
    }
}
