use image::{DynamicImage, codecs::png::PngEncoder};
use std::path::Path;

use crate::export::error::ExportError;

/// Save image as PNG.
pub fn save(image: &DynamicImage, path: &Path) -> Result<(), ExportError> {
    let output = std::fs::File::create(path).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    let encoder = PngEncoder::new(output);
    image
        .write_with_encoder(encoder)
        .map_err(|e| ExportError::WriteFailed {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}
