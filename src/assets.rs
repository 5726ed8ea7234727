use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use walkdir::WalkDir;

use crate::watermark::WatermarkError;

/// Input extensions accepted for source and watermark images.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Decode budget: one oversized file must not take down a whole batch.
const MAX_PIXELS: u64 = 256_000_000;

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// A source raster image. Dimensions are read lazily from the file header
/// and cached for the rest of the asset's life.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    path: PathBuf,
    dimensions: OnceLock<(u32, u32)>,
}

impl ImageAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dimensions: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Width and height, read from the file header on first use.
    pub fn dimensions(&self) -> Result<(u32, u32), WatermarkError> {
        if let Some(dims) = self.dimensions.get() {
            return Ok(*dims);
        }
        let dims = image::image_dimensions(&self.path).map_err(|source| {
            WatermarkError::AssetUnreadable {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(*self.dimensions.get_or_init(|| dims))
    }

    /// Decode the full image.
    pub fn read(&self) -> Result<DynamicImage, WatermarkError> {
        read_image(&self.path)
    }
}

/// Decode an image, rejecting files above the pixel budget before the full
/// decode is attempted.
pub fn read_image(path: &Path) -> Result<DynamicImage, WatermarkError> {
    read_image_with_limit(path, MAX_PIXELS)
}

pub(crate) fn read_image_with_limit(
    path: &Path,
    max_pixels: u64,
) -> Result<DynamicImage, WatermarkError> {
    let (width, height) =
        image::image_dimensions(path).map_err(|source| WatermarkError::AssetUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
    if width as u64 * height as u64 > max_pixels {
        return Err(WatermarkError::ResourceExhausted {
            path: path.to_path_buf(),
            width,
            height,
        });
    }
    image::open(path).map_err(|source| WatermarkError::AssetUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Collect the supported images under `dir`, sorted by path. With
/// `recursive` set, subdirectories are walked too; hidden files are skipped
/// either way.
pub fn scan_directory(dir: &Path, recursive: bool) -> Result<Vec<ImageAsset>, WatermarkError> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).follow_links(false) {
        let entry = entry.map_err(|e| WatermarkError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if is_supported_image(entry.path()) {
            found.push(ImageAsset::new(entry.path()));
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("found {} image(s) under {:?}", found.len(), dir);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::TempDir;

    fn save_test_image(path: &Path, width: u32, height: u32) {
        let img = ImageBuffer::from_pixel(width, height, Rgba([10u8, 20, 30, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.JPG")));
        assert!(is_supported_image(Path::new("photo.Jpeg")));
        assert!(is_supported_image(Path::new("photo.bmp")));
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.webp")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn test_lazy_dimensions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("small.png");
        save_test_image(&path, 5, 7);

        let asset = ImageAsset::new(&path);
        assert_eq!(asset.dimensions().unwrap(), (5, 7));
        // Second call hits the cache
        assert_eq!(asset.dimensions().unwrap(), (5, 7));
    }

    #[test]
    fn test_dimensions_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        std::fs::write(&path, b"this is not a png").unwrap();

        let asset = ImageAsset::new(&path);
        assert!(matches!(
            asset.dimensions(),
            Err(WatermarkError::AssetUnreadable { .. })
        ));
    }

    #[test]
    fn test_pixel_budget() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big.png");
        save_test_image(&path, 20, 20);

        let err = read_image_with_limit(&path, 100).unwrap_err();
        assert!(matches!(
            err,
            WatermarkError::ResourceExhausted {
                width: 20,
                height: 20,
                ..
            }
        ));

        assert!(read_image_with_limit(&path, 400).is_ok());
    }

    #[test]
    fn test_scan_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        save_test_image(&root.join("b.png"), 4, 4);
        save_test_image(&root.join("a.png"), 4, 4);
        std::fs::write(root.join("notes.txt"), b"not an image").unwrap();
        save_test_image(&root.join(".hidden.png"), 4, 4);
        std::fs::create_dir(root.join("sub")).unwrap();
        save_test_image(&root.join("sub").join("c.bmp"), 4, 4);

        let flat = scan_directory(root, false).unwrap();
        let names: Vec<String> = flat.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);

        let deep = scan_directory(root, true).unwrap();
        let names: Vec<String> = deep.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.bmp"]);
    }
}
