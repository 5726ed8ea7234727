use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("cannot decode source image {path}: {source}")]
    AssetUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The configured watermark image is broken, as opposed to no watermark
    /// image being configured at all (which renders nothing).
    #[error("cannot decode watermark image {path}: {source}")]
    WatermarkAssetUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no font file for {family} ({style}) under {directory}")]
    FontUnavailable {
        family: String,
        style: String,
        directory: PathBuf,
    },

    #[error("failed to parse font file {0}")]
    FontInvalid(PathBuf),

    #[error("image {path} is too large to process ({width}x{height})")]
    ResourceExhausted {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
