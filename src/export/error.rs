use std::path::PathBuf;
use thiserror::Error;

use crate::watermark::WatermarkError;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Exporting into a directory that holds source images would overwrite
    /// the originals; the whole job is rejected before any write.
    #[error("output directory {0} is also a source directory")]
    InvalidOutputDirectory(PathBuf),

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
