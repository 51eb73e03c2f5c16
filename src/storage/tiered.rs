use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::file::FileCache;
use super::memory::MemoryCache;
use super::traits::CacheBackend;
use crate::domain::AggregateSnapshot;

/// Ordered list of cache backends, fastest first
///
/// A lookup walks the tiers in order and backfills the faster ones on a
/// hit. Publishing writes the first tier inline and the rest in a background
/// task. Backend errors are logged and treated as misses.
///
/// Background writes are numbered. A write that is overtaken by a newer
/// publish or by an invalidation is dropped, so the slower tiers never end
/// up behind the first one.
pub struct TieredCache {
    backends: Vec<Arc<dyn CacheBackend>>,
    /// Number of the latest publish or invalidation
    latest: Arc<AtomicU64>,
    /// Held while the background tiers are written or cleared
    persist_lock: Arc<Mutex<()>>,
}

impl TieredCache {
    pub fn new(backends: Vec<Arc<dyn CacheBackend>>) -> Self {
        Self {
            backends,
            latest: Arc::new(AtomicU64::new(0)),
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Memory slot in front of a durable file
    pub fn memory_and_file(memory: MemoryCache, file: FileCache) -> Self {
        Self::new(vec![Arc::new(memory), Arc::new(file)])
    }

    pub fn backends(&self) -> &[Arc<dyn CacheBackend>] {
        &self.backends
    }

    /// Return the first cached snapshot found, if any
    pub async fn lookup(&self) -> Option<Arc<AggregateSnapshot>> {
        for (tier, backend) in self.backends.iter().enumerate() {
            match backend.load().await {
                Ok(Some(snapshot)) => {
                    debug!(backend = backend.name(), "Cache hit");
                    for faster in &self.backends[..tier] {
                        if let Err(e) = faster.store(Arc::clone(&snapshot)).await {
                            warn!(backend = faster.name(), error = %e, "Cache backfill failed");
                        }
                    }
                    return Some(snapshot);
                }
                Ok(None) => debug!(backend = backend.name(), "Cache miss"),
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Cache read failed, treating as miss");
                }
            }
        }
        None
    }

    /// Store a fresh snapshot in every tier
    ///
    /// Returns once the first tier is written; the handle tracks the rest.
    pub async fn publish(&self, snapshot: Arc<AggregateSnapshot>) -> PersistHandle {
        let Some((first, rest)) = self.backends.split_first() else {
            return PersistHandle::default();
        };
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        if let Err(e) = first.store(Arc::clone(&snapshot)).await {
            warn!(backend = first.name(), error = %e, "Cache write failed");
        }
        if rest.is_empty() {
            return PersistHandle::default();
        }

        let rest = rest.to_vec();
        let latest = Arc::clone(&self.latest);
        let persist_lock = Arc::clone(&self.persist_lock);
        let task = tokio::spawn(async move {
            let _guard = persist_lock.lock().await;
            if latest.load(Ordering::SeqCst) != seq {
                debug!(seq, records = snapshot.total_records, "Superseded snapshot not persisted");
                return;
            }
            for backend in rest {
                if let Err(e) = backend.store(Arc::clone(&snapshot)).await {
                    error!(
                        backend = backend.name(),
                        error = %e,
                        "Snapshot persistence failed, previous copy kept"
                    );
                }
            }
        });

        PersistHandle { tasks: vec![task] }
    }

    /// Drop the cached snapshot from every tier
    ///
    /// Background writes that have not started yet are discarded; one in
    /// progress finishes before the tiers are cleared.
    pub async fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        let _guard = self.persist_lock.lock().await;
        for backend in &self.backends {
            if let Err(e) = backend.invalidate().await {
                warn!(backend = backend.name(), error = %e, "Cache invalidation failed");
            }
        }
    }
}

/// Background writes started by [`TieredCache::publish`]
#[derive(Debug, Default)]
pub struct PersistHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl PersistHandle {
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every background write to settle
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Persistence task failed");
            }
        }
    }
}
