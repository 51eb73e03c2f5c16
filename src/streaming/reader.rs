use csv_async::AsyncReader;
use futures::StreamExt;
use futures::io::AsyncRead;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::io::{RawRow, csv_reader};

/// A run of consecutive rows tagged with its position in the input
#[derive(Debug)]
pub struct Chunk {
    pub index: usize,
    pub rows: Vec<RawRow>,
}

/// Completion report sent once the reader stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    /// Chunks handed to the channel, indices `0..chunks`
    pub chunks: usize,
    /// Data rows read, header excluded, malformed rows included
    pub rows: usize,
    /// Rows the CSV layer could not read
    pub read_errors: usize,
    /// Reading stopped before end of input
    pub interrupted: bool,
}

/// Sequential CSV reader that groups rows into indexed chunks
pub struct BatchReader<R> {
    reader: AsyncReader<R>,
    chunk_size: usize,
}

impl<R> BatchReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            reader: csv_reader(source),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Read to the end (or until cancelled) and report on `done`
    ///
    /// Sends wait for channel capacity. The output channel closes when this
    /// returns.
    pub async fn run(
        mut self,
        chunks: mpsc::Sender<Chunk>,
        done: oneshot::Sender<ReadSummary>,
        cancel: CancellationToken,
    ) {
        let summary = self.read_chunks(&chunks, &cancel).await;
        drop(chunks);

        debug!(
            chunks = summary.chunks,
            rows = summary.rows,
            interrupted = summary.interrupted,
            "Batch reader finished"
        );
        // The pipeline may have been dropped already; nobody left to tell
        let _ = done.send(summary);
    }

    async fn read_chunks(
        &mut self,
        chunks: &mpsc::Sender<Chunk>,
        cancel: &CancellationToken,
    ) -> ReadSummary {
        let chunk_size = self.chunk_size;
        let mut summary = ReadSummary::default();
        let mut buffer: Vec<RawRow> = Vec::with_capacity(chunk_size);
        let mut records = self.reader.records();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.interrupted = true;
                    // Workers stop pulling once cancelled, so only try once
                    if !buffer.is_empty() {
                        let chunk = Chunk { index: summary.chunks, rows: buffer };
                        if chunks.try_send(chunk).is_ok() {
                            summary.chunks += 1;
                        }
                    }
                    return summary;
                }
                next = records.next() => next,
            };

            match next {
                None => break,
                Some(Ok(row)) => {
                    summary.rows += 1;
                    buffer.push(row);
                    if buffer.len() >= chunk_size {
                        let rows = std::mem::replace(&mut buffer, Vec::with_capacity(chunk_size));
                        if !dispatch(chunks, cancel, &mut summary, rows).await {
                            return summary;
                        }
                    }
                }
                Some(Err(e)) if matches!(e.kind(), csv_async::ErrorKind::Io(_)) => {
                    error!(error = %e, rows = summary.rows, "Source read failed, stopping early");
                    summary.interrupted = true;
                    break;
                }
                Some(Err(e)) => {
                    summary.rows += 1;
                    summary.read_errors += 1;
                    warn!(error = %e, "Skipping unreadable row");
                }
            }
        }

        if !buffer.is_empty() {
            dispatch(chunks, cancel, &mut summary, buffer).await;
        }
        summary
    }
}

/// Send one chunk, returning false if the run should stop
async fn dispatch(
    chunks: &mpsc::Sender<Chunk>,
    cancel: &CancellationToken,
    summary: &mut ReadSummary,
    rows: Vec<RawRow>,
) -> bool {
    let chunk = Chunk {
        index: summary.chunks,
        rows,
    };

    let sent = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            summary.interrupted = true;
            false
        }
        result = chunks.send(chunk) => result.is_ok(),
    };

    if sent {
        summary.chunks += 1;
    } else {
        summary.interrupted = true;
    }
    sent
}
