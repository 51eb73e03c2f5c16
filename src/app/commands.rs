use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::cli::Command;
use super::error::AppError;
use crate::config::Config;
use crate::service::{AnalyticsService, CsvSnapshotProducer};
use crate::storage::{CacheBackend, FileCache};

/// Run one command and write its JSON output to `out`
pub async fn execute<W>(
    command: Command,
    mut config: Config,
    out: &mut W,
    cancel: CancellationToken,
) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Get | Command::Refresh => {
            let service = AnalyticsService::from_config(&config).with_cancellation(cancel);
            let snapshot = if command == Command::Get {
                service.get().await?
            } else {
                service.refresh().await?
            };
            service.flush().await;
            write_json(out, snapshot.as_ref()).await
        }
        Command::Preprocess { csv, cache } => {
            if let Some(path) = csv {
                config.csv.file_path = path;
            }
            if let Some(path) = cache {
                config.cache.file_path = path;
            }

            let source = &config.csv.file_path;
            if !tokio::fs::try_exists(source).await.unwrap_or(false) {
                return Err(AppError::FileNotFound(source.display().to_string()));
            }

            let producer = CsvSnapshotProducer::new(source, config.csv.pipeline());
            let produced = producer.produce_with_stats(cancel).await?;

            let file = FileCache::new(&config.cache.file_path);
            file.store(Arc::new(produced.snapshot)).await?;
            info!(cache = %file.path().display(), "Cache file written");

            write_json(out, &produced.stats).await
        }
    }
}

async fn write_json<W, T>(out: &mut W, value: &T) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    out.write_all(&json).await?;
    out.flush().await?;
    Ok(())
}
