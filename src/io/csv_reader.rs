use std::path::Path;

use csv_async::{AsyncReader, AsyncReaderBuilder, Trim};
use futures::io::AsyncRead;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use super::error::IoError;

/// Buffered file handle adapted to the futures `AsyncRead` that csv-async expects
pub type SourceReader = Compat<BufReader<File>>;

/// Open the CSV source with a read buffer of `buffer_size` bytes
///
/// A missing or unreadable file is reported here, before any pipeline
/// task is started.
pub async fn open_source(path: impl AsRef<Path>, buffer_size: usize) -> Result<SourceReader, IoError> {
    let file = File::open(path.as_ref()).await?;
    Ok(BufReader::with_capacity(buffer_size.max(1), file).compat())
}

/// Create a CSV reader over any async byte source
///
/// The first line is treated as a header and skipped by the record stream.
/// Rows may have differing lengths; column checks happen in the row parser.
pub fn csv_reader<R>(reader: R) -> AsyncReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    AsyncReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .create_reader(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::io::Cursor;
    use std::io::Write;

    #[tokio::test]
    async fn skips_header_and_reads_rows() {
        let csv_data = "\
transaction_id,transaction_date,user_id
T1, 2023-01-01 ,U1
T2,2023-01-02,U2
";
        let mut reader = csv_reader(Cursor::new(csv_data.as_bytes()));
        let rows: Vec<_> = reader.records().collect().await;

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.get(0), Some("T1"));
        assert_eq!(first.get(1), Some("2023-01-01"));
    }

    #[tokio::test]
    async fn accepts_ragged_rows() {
        let csv_data = "a,b,c\n1,2\n1,2,3,4\n";
        let mut reader = csv_reader(Cursor::new(csv_data.as_bytes()));
        let rows: Vec<_> = reader.records().collect().await;

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.is_ok()));
    }

    #[tokio::test]
    async fn open_missing_file_fails() {
        let result = open_source("/nonexistent/transactions.csv", 1024).await;
        assert!(matches!(result, Err(IoError::Io(_))));
    }

    #[tokio::test]
    async fn open_existing_file_streams_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "h1,h2").unwrap();
        writeln!(file, "x,y").unwrap();

        let source = open_source(file.path(), 16).await.unwrap();
        let mut reader = csv_reader(source);
        let rows: Vec<_> = reader.records().collect().await;

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().get(1), Some("y"));
    }
}
