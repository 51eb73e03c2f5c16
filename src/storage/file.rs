use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::error::StorageError;
use super::traits::CacheBackend;
use crate::domain::AggregateSnapshot;

/// Snapshot persisted as one JSON document
///
/// Writes land in a sibling `.tmp` file that is renamed over the target,
/// so a reader never sees a half-written document.
pub struct FileCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Option<Arc<AggregateSnapshot>>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut snapshot: AggregateSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        snapshot.cache_hit = true;
        Ok(Some(Arc::new(snapshot)))
    }

    async fn store(&self, snapshot: Arc<AggregateSnapshot>) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(snapshot.as_ref())?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        info!(
            path = %self.path.display(),
            bytes = json.len(),
            records = snapshot.total_records,
            "Snapshot persisted"
        );
        Ok(())
    }

    async fn invalidate(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
