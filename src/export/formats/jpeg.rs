use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use std::path::Path;
use tracing::debug;

use crate::export::error::ExportError;

/// Save image as JPEG at the given quality (clamped to 1-100).
pub fn save(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), ExportError> {
    let quality = quality.clamp(1, 100);
    // JPEG doesn't support an alpha channel, so convert to RGB
    let rgb_image = image.to_rgb8();
    let output = std::fs::File::create(path).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let encoder = JpegEncoder::new_with_quality(output, quality);
    encoder
        .write_image(
            &rgb_image,
            rgb_image.width(),
            rgb_image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| ExportError::WriteFailed {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
    debug!("JPEG written at quality {}: {:?}", quality, path);
    Ok(())
}
