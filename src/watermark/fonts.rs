use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use imageproc::drawing::text_size;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::error::WatermarkError;

/// Measurements for one string at one font configuration. `width` is the
/// rendered pixel width, `line_height` the font's full line height
/// (ascent - descent + line gap) independent of the glyphs actually used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: u32,
    pub line_height: u32,
    pub ascent: f32,
}

/// File-based font resolution and text measurement.
///
/// Families map to `.ttf` files under a single directory: `Family.ttf` for
/// the regular cut, with `-Bold`, `-Italic`/`-Oblique` and
/// `-BoldItalic`/`-BoldOblique` suffixes for styled cuts. A styled request
/// falls back to the regular file when no styled cut exists, mirroring how
/// toolkits synthesize missing styles. Parsed fonts are cached per
/// family/style combination.
pub struct FontCatalog {
    directory: PathBuf,
    cache: Mutex<HashMap<(String, bool, bool), Arc<FontVec>>>,
}

impl FontCatalog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_lock(&self) -> MutexGuard<'_, HashMap<(String, bool, bool), Arc<FontVec>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load (or fetch from cache) the font for a family/style combination.
    pub fn resolve(
        &self,
        family: &str,
        bold: bool,
        italic: bool,
    ) -> Result<Arc<FontVec>, WatermarkError> {
        let key = (family.to_string(), bold, italic);
        if let Some(font) = self.cache_lock().get(&key) {
            return Ok(font.clone());
        }

        let mut suffixes: Vec<&str> = match (bold, italic) {
            (true, true) => vec!["-BoldItalic", "-BoldOblique"],
            (true, false) => vec!["-Bold"],
            (false, true) => vec!["-Italic", "-Oblique"],
            (false, false) => vec![],
        };
        // Regular cut stands in when the styled file is absent.
        suffixes.push("");

        for suffix in suffixes {
            let path = self.directory.join(format!("{family}{suffix}.ttf"));
            if !path.is_file() {
                continue;
            }
            let data = std::fs::read(&path)?;
            let font = FontVec::try_from_vec(data)
                .map_err(|_| WatermarkError::FontInvalid(path.clone()))?;
            debug!("loaded font {:?} for {} (bold={}, italic={})", path, family, bold, italic);
            let font = Arc::new(font);
            self.cache_lock().insert(key, font.clone());
            return Ok(font);
        }

        Err(WatermarkError::FontUnavailable {
            family: family.to_string(),
            style: style_label(bold, italic),
            directory: self.directory.clone(),
        })
    }

    /// Measure `text` at the given family/style/size.
    pub fn measure(
        &self,
        text: &str,
        family: &str,
        bold: bool,
        italic: bool,
        size: f32,
    ) -> Result<TextMetrics, WatermarkError> {
        let font = self.resolve(family, bold, italic)?;
        Ok(measure_with(&font, text, size))
    }
}

/// Measure with an already-resolved font.
pub(crate) fn measure_with(font: &FontVec, text: &str, size: f32) -> TextMetrics {
    let scale = PxScale::from(size);
    let scaled = font.as_scaled(scale);
    let ascent = scaled.ascent();
    let line_height = (scaled.height() + scaled.line_gap()).ceil() as u32;
    let width = if text.is_empty() {
        0
    } else {
        text_size(scale, font, text).0
    };
    TextMetrics {
        width,
        line_height,
        ascent,
    }
}

fn style_label(bold: bool, italic: bool) -> String {
    match (bold, italic) {
        (true, true) => "bold italic".to_string(),
        (true, false) => "bold".to_string(),
        (false, true) => "italic".to_string(),
        (false, false) => "regular".to_string(),
    }
}
