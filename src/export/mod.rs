// Batch export - drives the compositing engine over a list of source
// images with per-item failure isolation and cooperative cancellation.
pub mod error;
pub mod formats;
pub mod naming;

pub use error::ExportError;
pub use formats::OutputFormat;
pub use naming::{NamingConvention, resolve_output_name};

use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assets::ImageAsset;
use crate::watermark::{FontCatalog, WatermarkSpec, composite};

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// One batch export request: which images, where the results go, and how
/// the outputs are named and encoded.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub assets: Vec<ImageAsset>,
    pub output_directory: PathBuf,
    pub naming: NamingConvention,
    /// Prefix or suffix token; unused for [`NamingConvention::Original`].
    pub token: String,
    pub format: OutputFormat,
    /// 1-100; ignored for PNG.
    pub jpeg_quality: u8,
}

impl ExportJob {
    pub fn new(assets: Vec<ImageAsset>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            assets,
            output_directory: output_directory.into(),
            naming: NamingConvention::Original,
            token: String::new(),
            format: OutputFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Progress snapshot emitted after each processed item; the final update
/// carries `processed == total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    pub processed: usize,
    pub total: usize,
    pub message: String,
}

/// Outcome of one completed (or cancelled) job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub summary: String,
}

pub struct ExportCoordinator {
    fonts: Arc<FontCatalog>,
}

impl ExportCoordinator {
    pub fn new(fonts: Arc<FontCatalog>) -> Self {
        Self { fonts }
    }

    /// Process the job's assets in list order against one spec snapshot.
    ///
    /// A decode or write failure on one asset is counted and logged, and
    /// processing moves on; only an output directory that would overwrite
    /// sources fails the job as a whole, before anything is written. The
    /// cancellation token is polled between items, so a cancelled job
    /// returns the counts accumulated so far and leaves no partially
    /// written file behind. Callers are expected to run at most one job at
    /// a time; exclusivity is not enforced here.
    pub async fn run(
        &self,
        job: ExportJob,
        spec: WatermarkSpec,
        cancel: CancellationToken,
        progress: mpsc::UnboundedSender<ExportProgress>,
    ) -> Result<ExportResult, ExportError> {
        guard_output_directory(&job)?;
        tokio::fs::create_dir_all(&job.output_directory).await?;

        let total = job.assets.len();
        info!("export started: {} file(s) -> {:?}", total, job.output_directory);

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut processed = 0usize;
        let mut cancelled = false;

        for asset in &job.assets {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let name = asset.file_name();
            match self.process_one(&job, &spec, asset).await {
                Ok(path) => {
                    succeeded += 1;
                    debug!("exported {:?}", path);
                }
                Err(e) => {
                    failed += 1;
                    warn!("skipping {}: {}", name, e);
                }
            }

            processed += 1;
            let _ = progress.send(ExportProgress {
                processed,
                total,
                message: format!("Processing {} of {}: {}", processed, total, name),
            });
        }

        let summary = if cancelled {
            format!(
                "Export cancelled after {} of {}. Successful: {} Failed: {}",
                processed, total, succeeded, failed
            )
        } else {
            format!("Export complete! Successful: {} Failed: {}", succeeded, failed)
        };
        info!("{}", summary);

        Ok(ExportResult {
            succeeded,
            failed,
            cancelled,
            summary,
        })
    }

    /// Read, composite and write a single asset on the blocking pool.
    async fn process_one(
        &self,
        job: &ExportJob,
        spec: &WatermarkSpec,
        asset: &ImageAsset,
    ) -> Result<PathBuf, ExportError> {
        let fonts = self.fonts.clone();
        let spec = spec.clone();
        let asset = asset.clone();
        let output_directory = job.output_directory.clone();
        let naming = job.naming;
        let token = job.token.clone();
        let format = job.format;
        let quality = job.jpeg_quality;

        tokio::task::spawn_blocking(move || -> Result<PathBuf, ExportError> {
            let source = asset.read()?;
            let rendered = DynamicImage::ImageRgba8(composite(&source, &spec, &fonts)?);
            let name = resolve_output_name(&asset.file_name(), naming, &token, format);
            let output_path = output_directory.join(&name);
            write_atomic(&rendered, &output_path, format, quality)?;
            Ok(output_path)
        })
        .await?
    }
}

/// Reject jobs whose output directory is also the parent of any source
/// asset, so exports can never clobber originals.
fn guard_output_directory(job: &ExportJob) -> Result<(), ExportError> {
    let output = canonical_or_raw(&job.output_directory);
    for asset in &job.assets {
        if let Some(parent) = asset.path().parent()
            && canonical_or_raw(parent) == output
        {
            return Err(ExportError::InvalidOutputDirectory(
                job.output_directory.clone(),
            ));
        }
    }
    Ok(())
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Encode next to the final path and rename into place, so a failed encode
/// never leaves a half-written output file.
fn write_atomic(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<(), ExportError> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".partial");
    let tmp = PathBuf::from(tmp_name);

    if let Err(e) = formats::save(image, &tmp, format, jpeg_quality) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(ExportError::WriteFailed {
            path: path.to_path_buf(),
            source: Box::new(e),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::TempDir;

    fn save_test_image(path: &Path, width: u32, height: u32) {
        let img = ImageBuffer::from_pixel(width, height, Rgba([90u8, 120, 150, 255]));
        img.save(path).unwrap();
    }

    fn coordinator() -> ExportCoordinator {
        // The default spec draws nothing, so no font files are needed.
        ExportCoordinator::new(Arc::new(FontCatalog::new("fonts")))
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<ExportProgress>) -> Vec<ExportProgress> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_batch_counts_progress_and_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let source_dir = temp_dir.path().join("in");
        let output_dir = temp_dir.path().join("out");
        std::fs::create_dir(&source_dir).unwrap();

        for name in ["a.png", "b.png", "c.png"] {
            save_test_image(&source_dir.join(name), 16, 16);
        }
        std::fs::write(source_dir.join("broken.png"), b"not an image").unwrap();

        let assets = vec![
            ImageAsset::new(source_dir.join("a.png")),
            ImageAsset::new(source_dir.join("b.png")),
            ImageAsset::new(source_dir.join("broken.png")),
            ImageAsset::new(source_dir.join("c.png")),
        ];
        let job = ExportJob::new(assets, &output_dir);

        let (tx, rx) = mpsc::unbounded_channel();
        let result = coordinator()
            .run(job, WatermarkSpec::default(), CancellationToken::new(), tx)
            .await
            .unwrap();

        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failed, 1);
        assert!(!result.cancelled);
        assert!(result.summary.contains("Successful: 3"));
        assert!(result.summary.contains("Failed: 1"));

        // Exactly one progress update per asset, in list order, ending at
        // total/total.
        let events = drain(rx).await;
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].message, "Processing 1 of 4: a.png");
        assert_eq!(events[2].message, "Processing 3 of 4: broken.png");
        assert_eq!(events[3].processed, 4);
        assert_eq!(events[3].total, 4);

        for name in ["a.png", "b.png", "c.png"] {
            assert!(output_dir.join(name).exists(), "{name} should be exported");
        }
        assert!(!output_dir.join("broken.png").exists());
        // No stray partial files either
        assert!(!output_dir.join("a.png.partial").exists());
    }

    #[tokio::test]
    async fn test_output_into_source_directory_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let source_dir = temp_dir.path().join("photos");
        std::fs::create_dir(&source_dir).unwrap();
        save_test_image(&source_dir.join("a.png"), 8, 8);

        let job = ExportJob::new(vec![ImageAsset::new(source_dir.join("a.png"))], &source_dir);

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = coordinator()
            .run(job, WatermarkSpec::default(), CancellationToken::new(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidOutputDirectory(_)));
        // Nothing was written
        assert!(!source_dir.join("a.png.partial").exists());
    }

    #[tokio::test]
    async fn test_cancelled_job_reports_partial_counts() {
        let temp_dir = TempDir::new().unwrap();
        let source_dir = temp_dir.path().join("in");
        let output_dir = temp_dir.path().join("out");
        std::fs::create_dir(&source_dir).unwrap();
        save_test_image(&source_dir.join("a.png"), 8, 8);

        let job = ExportJob::new(vec![ImageAsset::new(source_dir.join("a.png"))], &output_dir);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let (tx, rx) = mpsc::unbounded_channel();
        let result = coordinator()
            .run(job, WatermarkSpec::default(), cancel, tx)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed, 0);
        assert!(result.summary.contains("cancelled"));
        assert!(drain(rx).await.is_empty());
        assert!(!output_dir.join("a.png").exists());
    }

    #[tokio::test]
    async fn test_naming_and_jpeg_output() {
        let temp_dir = TempDir::new().unwrap();
        let source_dir = temp_dir.path().join("in");
        let output_dir = temp_dir.path().join("out");
        std::fs::create_dir(&source_dir).unwrap();
        save_test_image(&source_dir.join("photo.png"), 12, 9);

        let mut job = ExportJob::new(
            vec![ImageAsset::new(source_dir.join("photo.png"))],
            &output_dir,
        );
        job.naming = NamingConvention::Suffix;
        job.token = "_wm".to_string();
        job.format = OutputFormat::Jpeg;
        job.jpeg_quality = 90;

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = coordinator()
            .run(job, WatermarkSpec::default(), CancellationToken::new(), tx)
            .await
            .unwrap();
        assert_eq!(result.succeeded, 1);

        let exported = output_dir.join("photo_wm.jpeg");
        assert!(exported.exists());
        let round_trip = image::open(&exported).unwrap();
        assert_eq!((round_trip.width(), round_trip.height()), (12, 9));
    }
}
