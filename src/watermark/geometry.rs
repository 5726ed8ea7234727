use super::error::WatermarkError;
use super::fonts::FontCatalog;
use super::types::{AnchorBox, Slot, WatermarkMode, WatermarkSpec};

/// Pixel margin kept between an anchored watermark and the canvas edge.
pub const DEFAULT_ANCHOR_MARGIN: i32 = 10;

/// Compute the unrotated pixel footprint of the watermark described by
/// `spec` — text extent at the configured font, or the watermark image's
/// native dimensions scaled and rounded toward zero. An empty text or an
/// unset watermark image yields a zero-area box.
pub fn measure_footprint(
    spec: &WatermarkSpec,
    fonts: &FontCatalog,
) -> Result<AnchorBox, WatermarkError> {
    match spec.mode {
        WatermarkMode::Text => {
            if spec.text.is_empty() {
                return Ok(AnchorBox::ZERO);
            }
            let metrics = fonts.measure(
                &spec.text,
                &spec.font_family,
                spec.bold,
                spec.italic,
                spec.font_size,
            )?;
            Ok(AnchorBox::new(metrics.width, metrics.line_height))
        }
        WatermarkMode::Image => {
            let Some(path) = &spec.image_path else {
                return Ok(AnchorBox::ZERO);
            };
            let (width, height) = image::image_dimensions(path).map_err(|source| {
                WatermarkError::WatermarkAssetUnreadable {
                    path: path.clone(),
                    source,
                }
            })?;
            Ok(AnchorBox::new(
                (width as f32 * spec.image_scale) as u32,
                (height as f32 * spec.image_scale) as u32,
            ))
        }
    }
}

/// Clamp `(x, y)` so the footprint stays inside the canvas:
/// `x` ends up in `[0, max(0, canvas_width - footprint.width)]`, `y`
/// likewise. Applied after every drag delta and manual coordinate edit.
pub fn clamp_position(
    x: i32,
    y: i32,
    footprint: AnchorBox,
    canvas_width: u32,
    canvas_height: u32,
) -> (i32, i32) {
    let max_x = (canvas_width as i64 - footprint.width as i64).max(0);
    let max_y = (canvas_height as i64 - footprint.height as i64).max(0);
    (
        (x as i64).clamp(0, max_x) as i32,
        (y as i64).clamp(0, max_y) as i32,
    )
}

/// Top-left position for one of the nine anchor presets.
///
/// Horizontally, `Start` keeps `margin` from the left edge; vertically the
/// top preset sits flush at 0 while the bottom keeps the margin. `Center`
/// is integer division, so odd gaps round down.
///
/// The formula is bounds-respecting for canvases at least as large as the
/// footprint plus margins; on smaller canvases the result can go negative,
/// and callers wanting a non-negative guarantee follow up with
/// [`clamp_position`].
pub fn anchor_position(
    h: Slot,
    v: Slot,
    footprint: AnchorBox,
    canvas_width: u32,
    canvas_height: u32,
    margin: i32,
) -> (i32, i32) {
    let cw = canvas_width as i64;
    let ch = canvas_height as i64;
    let fw = footprint.width as i64;
    let fh = footprint.height as i64;

    let x = match h {
        Slot::Start => margin as i64,
        Slot::Center => (cw - fw) / 2,
        Slot::End => cw - fw - margin as i64,
    };
    let y = match v {
        Slot::Start => 0,
        Slot::Center => (ch - fh) / 2,
        Slot::End => ch - fh - margin as i64,
    };
    (x as i32, y as i32)
}
