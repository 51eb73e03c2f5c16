use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::ServiceError;
use super::producer::{CsvSnapshotProducer, SnapshotProducer};
use crate::config::Config;
use crate::domain::AggregateSnapshot;
use crate::storage::{FileCache, MemoryCache, PersistHandle, TieredCache};

/// Cached access to the aggregate views
///
/// At most one recompute runs at a time. Readers that find a valid cached
/// snapshot never wait on a recompute in progress.
pub struct AnalyticsService {
    producer: Arc<dyn SnapshotProducer>,
    cache: TieredCache,
    /// Serializes recomputes; holds the snapshot the last one published
    refresh_lock: Mutex<Option<Arc<AggregateSnapshot>>>,
    /// Bumped after every published recompute
    generation: AtomicU64,
    recomputes: AtomicU64,
    pending: Mutex<Vec<PersistHandle>>,
    cancel: CancellationToken,
}

impl AnalyticsService {
    pub fn new(producer: Arc<dyn SnapshotProducer>, cache: TieredCache) -> Self {
        Self {
            producer,
            cache,
            refresh_lock: Mutex::new(None),
            generation: AtomicU64::new(0),
            recomputes: AtomicU64::new(0),
            pending: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// CSV-backed service with a memory slot in front of the cache file
    pub fn from_config(config: &Config) -> Self {
        let producer = CsvSnapshotProducer::new(&config.csv.file_path, config.csv.pipeline());
        let cache = TieredCache::memory_and_file(
            MemoryCache::new(config.cache.ttl, config.cache.max_memory_bytes),
            FileCache::new(&config.cache.file_path),
        );
        Self::new(Arc::new(producer), cache)
    }

    /// Tie recomputes to an outer token, cancelled on shutdown
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current snapshot, computed on demand when no tier holds a valid one
    pub async fn get(&self) -> Result<Arc<AggregateSnapshot>, ServiceError> {
        if let Some(snapshot) = self.cache.lookup().await {
            return Ok(snapshot);
        }

        let mut last = self.refresh_lock.lock().await;
        // Another caller may have filled the cache while we waited
        if let Some(snapshot) = self.cache.lookup().await {
            return Ok(snapshot);
        }
        self.recompute(&mut last).await
    }

    /// Force a recompute, ignoring cached data
    ///
    /// Callers that queued behind a recompute which finished while they
    /// waited get that result instead of starting another one.
    pub async fn refresh(&self) -> Result<Arc<AggregateSnapshot>, ServiceError> {
        let seen = self.generation.load(Ordering::Acquire);
        let mut last = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != seen
            && let Some(snapshot) = last.as_ref()
        {
            debug!("Reusing snapshot from concurrent refresh");
            return Ok(Arc::clone(snapshot));
        }
        self.recompute(&mut last).await
    }

    /// Drop cached data from every tier
    pub async fn invalidate(&self) {
        let mut last = self.refresh_lock.lock().await;
        *last = None;
        self.cache.invalidate().await;
        info!("Analytics cache invalidated");
    }

    /// Number of recomputes started since construction
    pub fn recomputes(&self) -> u64 {
        self.recomputes.load(Ordering::SeqCst)
    }

    /// Cancel any recompute in progress
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for background cache writes to settle
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *self.pending.lock().await);
        for handle in pending {
            handle.wait().await;
        }
    }

    async fn recompute(
        &self,
        last: &mut Option<Arc<AggregateSnapshot>>,
    ) -> Result<Arc<AggregateSnapshot>, ServiceError> {
        let run = self.recomputes.fetch_add(1, Ordering::SeqCst) + 1;
        info!(run, "Recomputing analytics snapshot");

        let snapshot = Arc::new(self.producer.produce(self.cancel.child_token()).await?);
        let handle = self.cache.publish(Arc::clone(&snapshot)).await;
        *last = Some(Arc::clone(&snapshot));
        self.generation.fetch_add(1, Ordering::Release);

        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CacheBackend, FixedMemory};
    use crate::streaming::PipelineError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    const MB: u64 = 1024 * 1024;

    /// Producer that blocks until the test hands out permits
    struct GatedProducer {
        calls: AtomicUsize,
        gate: Semaphore,
    }

    impl GatedProducer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
            })
        }

        fn open(&self, permits: usize) {
            self.gate.add_permits(permits);
        }
    }

    #[async_trait]
    impl SnapshotProducer for GatedProducer {
        async fn produce(&self, cancel: CancellationToken) -> Result<AggregateSnapshot, ServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::select! {
                _ = cancel.cancelled() => Err(PipelineError::Cancelled.into()),
                permit = self.gate.acquire() => {
                    permit.unwrap().forget();
                    Ok(AggregateSnapshot {
                        total_records: call,
                        ..AggregateSnapshot::empty()
                    })
                }
            }
        }
    }

    fn memory_only(probe: Arc<FixedMemory>) -> TieredCache {
        let memory = MemoryCache::new(Duration::from_secs(60), 100 * MB).with_probe(probe);
        TieredCache::new(vec![Arc::new(memory) as Arc<dyn CacheBackend>])
    }

    fn service(producer: &Arc<GatedProducer>) -> Arc<AnalyticsService> {
        let producer = Arc::clone(producer) as Arc<dyn SnapshotProducer>;
        Arc::new(AnalyticsService::new(producer, memory_only(Arc::new(FixedMemory::new(MB)))))
    }

    /// Let every spawned task run until it blocks
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn first_get_computes_then_serves_from_cache() {
        let producer = GatedProducer::new();
        producer.open(10);
        let service = service(&producer);

        let first = service.get().await.unwrap();
        let second = service.get().await.unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.total_records, second.total_records);
        assert_eq!(service.recomputes(), 1);
    }

    #[tokio::test]
    async fn concurrent_cold_gets_compute_once() {
        let producer = GatedProducer::new();
        let service = service(&producer);

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.get().await })
            })
            .collect();
        settle().await;
        producer.open(10);

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().total_records, 1);
        }
        assert_eq!(service.recomputes(), 1);
    }

    #[tokio::test]
    async fn concurrent_refreshes_run_one_recompute() {
        let producer = GatedProducer::new();
        producer.open(1);
        let service = service(&producer);
        service.get().await.unwrap();

        let leader = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.refresh().await })
        };
        settle().await;
        assert_eq!(producer.calls.load(Ordering::SeqCst), 2);

        let followers: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.refresh().await })
            })
            .collect();

        // Readers keep getting the previous snapshot while the refresh runs
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.get().await })
            })
            .collect();
        for reader in readers {
            let snapshot = reader.await.unwrap().unwrap();
            assert_eq!(snapshot.total_records, 1);
            assert!(snapshot.cache_hit);
        }

        settle().await;
        producer.open(10);

        let published = leader.await.unwrap().unwrap();
        assert_eq!(published.total_records, 2);
        for follower in followers {
            let reused = follower.await.unwrap().unwrap();
            assert!(Arc::ptr_eq(&reused, &published));
            assert!(!reused.cache_hit);
        }
        assert_eq!(service.recomputes(), 2);
        assert_eq!(producer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sequential_refreshes_each_recompute() {
        let producer = GatedProducer::new();
        producer.open(10);
        let service = service(&producer);

        service.refresh().await.unwrap();
        let second = service.refresh().await.unwrap();

        assert_eq!(second.total_records, 2);
        assert!(!second.cache_hit);
        assert_eq!(service.recomputes(), 2);
    }

    #[tokio::test]
    async fn memory_pressure_forces_recompute() {
        let producer = GatedProducer::new();
        producer.open(10);
        let probe = Arc::new(FixedMemory::new(MB));
        let producer_dyn = Arc::clone(&producer) as Arc<dyn SnapshotProducer>;
        let service = AnalyticsService::new(producer_dyn, memory_only(Arc::clone(&probe)));

        service.get().await.unwrap();
        probe.set(500 * MB);
        let snapshot = service.get().await.unwrap();

        assert!(!snapshot.cache_hit);
        assert_eq!(service.recomputes(), 2);
    }

    #[tokio::test]
    async fn queued_refresh_reuses_result_under_memory_pressure() {
        let producer = GatedProducer::new();
        let probe = Arc::new(FixedMemory::new(MB));
        let producer_dyn = Arc::clone(&producer) as Arc<dyn SnapshotProducer>;
        let service = Arc::new(AnalyticsService::new(producer_dyn, memory_only(Arc::clone(&probe))));

        let leader = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.refresh().await })
        };
        settle().await;
        let follower = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.refresh().await })
        };
        settle().await;

        // Nothing can be served from memory once the ceiling is crossed
        probe.set(500 * MB);
        producer.open(10);

        let published = leader.await.unwrap().unwrap();
        let reused = follower.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&reused, &published));
        assert_eq!(service.recomputes(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let producer = GatedProducer::new();
        producer.open(10);
        let service = service(&producer);

        service.get().await.unwrap();
        service.invalidate().await;
        let snapshot = service.get().await.unwrap();

        assert_eq!(snapshot.total_records, 2);
        assert_eq!(service.recomputes(), 2);
    }

    #[tokio::test]
    async fn cancelled_recompute_publishes_nothing() {
        let producer = GatedProducer::new();
        let service = service(&producer);

        let pending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get().await })
        };
        settle().await;
        service.shutdown();

        let err = pending.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(service.cache.lookup().await.is_none());
    }
}
