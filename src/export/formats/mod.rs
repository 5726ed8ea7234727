// Output encoders - PNG is lossless, JPEG takes an explicit quality
pub mod jpeg;
pub mod png;

use image::DynamicImage;
use std::path::Path;
use std::str::FromStr;

use super::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(format!("unknown output format {other:?}, expected png or jpeg")),
        }
    }
}

/// Write `image` to `path` in the requested format. `jpeg_quality` is
/// ignored for PNG.
pub fn save(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<(), ExportError> {
    match format {
        OutputFormat::Png => png::save(image, path),
        OutputFormat::Jpeg => jpeg::save(image, path, jpeg_quality),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpeg");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("tiff".parse::<OutputFormat>().is_err());
    }
}
