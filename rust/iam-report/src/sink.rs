use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::{HEADER, ReportRow};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write a CSV record: {0}")]
    Csv(#[from] csv_async::Error),

    #[error("Failed to flush the report: {0}")]
    Flush(#[from] std::io::Error),
}

/// Write the header followed by one record per row to `writer`.
pub async fn write_csv<W>(writer: W, rows: &[ReportRow]) -> Result<(), SinkError>
where
    W: AsyncWrite + Unpin,
{
    let mut csv = csv_async::AsyncWriter::from_writer(writer);

    csv.write_record(HEADER).await?;
    for row in rows {
        csv.write_record(row.record()).await?;
    }

    csv.flush().await?;
    Ok(())
}

/// Create (or truncate) the file at `path` and write the report into it.
/// The file is closed when this returns, whether or not writing succeeded.
pub async fn write_csv_file(path: &Path, rows: &[ReportRow]) -> Result<(), SinkError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    write_csv(&mut file, rows).await?;
    file.sync_all().await?;
    Ok(())
}
