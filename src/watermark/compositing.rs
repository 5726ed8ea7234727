use ab_glyph::PxScale;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::trace;

use crate::assets;

use super::error::WatermarkError;
use super::fonts::{self, FontCatalog};
use super::types::{Color, WatermarkMode, WatermarkSpec};

/// Render the watermark described by `spec` onto a copy of `source`.
///
/// The output canvas always has the source's dimensions in RGBA; the source
/// itself is never touched. Text mode rotates about the horizontal midpoint
/// of its baseline start `(x + text_width/2, y)`; image mode rotates about
/// the scaled watermark's true center. A rotation that normalizes to 0°
/// takes a direct overlay path and is pixel-identical to an unrotated draw.
///
/// A text spec with empty content, or an image spec with no watermark image
/// configured, returns the plain copy. A configured-but-undecodable
/// watermark image fails with [`WatermarkError::WatermarkAssetUnreadable`]
/// so callers can tell it apart from "nothing configured".
pub fn composite(
    source: &DynamicImage,
    spec: &WatermarkSpec,
    fonts: &FontCatalog,
) -> Result<RgbaImage, WatermarkError> {
    let mut canvas = source.to_rgba8();
    let rotation = spec.normalized_rotation();

    match spec.mode {
        WatermarkMode::Text => {
            if spec.text.is_empty() {
                return Ok(canvas);
            }
            let font = fonts.resolve(&spec.font_family, spec.bold, spec.italic)?;
            let metrics = fonts::measure_with(&font, &spec.text, spec.font_size);
            if metrics.width == 0 || metrics.line_height == 0 {
                return Ok(canvas);
            }
            let layer = rasterize_text(&font, spec, metrics.width, metrics.line_height);
            let pivot = (
                spec.x as f64 + metrics.width as f64 / 2.0,
                spec.y as f64,
            );
            overlay_layer(&mut canvas, &layer, spec.x, spec.y, pivot, rotation);
        }
        WatermarkMode::Image => {
            let Some(path) = &spec.image_path else {
                return Ok(canvas);
            };
            let watermark = match assets::read_image(path) {
                Ok(img) => img,
                Err(WatermarkError::AssetUnreadable { path, source }) => {
                    return Err(WatermarkError::WatermarkAssetUnreadable { path, source });
                }
                Err(e) => return Err(e),
            };
            let render_width = (watermark.width() as f32 * spec.image_scale) as u32;
            let render_height = (watermark.height() as f32 * spec.image_scale) as u32;
            if render_width == 0 || render_height == 0 {
                return Ok(canvas);
            }
            let layer =
                prepare_image_layer(&watermark, render_width, render_height, spec.image_opacity);
            let pivot = (
                spec.x as f64 + render_width as f64 / 2.0,
                spec.y as f64 + render_height as f64 / 2.0,
            );
            overlay_layer(&mut canvas, &layer, spec.x, spec.y, pivot, rotation);
        }
    }

    Ok(canvas)
}

/// Rasterize the spec's text into a transparent layer of the footprint size,
/// top-left at the origin, baseline at the font ascent.
fn rasterize_text(
    font: &ab_glyph::FontVec,
    spec: &WatermarkSpec,
    width: u32,
    height: u32,
) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    let Color { r, g, b } = spec.color;
    draw_text_mut(
        &mut layer,
        Rgba([r, g, b, 255]),
        0,
        0,
        PxScale::from(spec.font_size),
        font,
        &spec.text,
    );
    // Glyph coverage landed in the alpha channel with coverage-scaled color
    // channels; rewrite to the uniform fill at coverage * opacity so the
    // blend below sees straight alpha.
    for px in layer.pixels_mut() {
        if px[3] > 0 {
            *px = Rgba([r, g, b, (px[3] as f32 * spec.opacity).round() as u8]);
        }
    }
    layer
}

/// Scale the watermark image to its render size and fold the configured
/// opacity into its alpha channel.
fn prepare_image_layer(watermark: &DynamicImage, width: u32, height: u32, opacity: f32) -> RgbaImage {
    let mut layer = if (width, height) == (watermark.width(), watermark.height()) {
        watermark.to_rgba8()
    } else {
        watermark
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8()
    };
    if opacity < 1.0 {
        for px in layer.pixels_mut() {
            px[3] = (px[3] as f32 * opacity) as u8;
        }
    }
    layer
}

/// Blend `layer` onto `canvas` with its top-left at `(x, y)`, rotated by
/// `rotation_degrees` about `pivot` (canvas coordinates). Zero rotation is
/// a plain alpha overlay; otherwise each affected canvas pixel is
/// inverse-mapped into the layer and bilinearly sampled, so no transform
/// state outlives the call.
fn overlay_layer(
    canvas: &mut RgbaImage,
    layer: &RgbaImage,
    x: i32,
    y: i32,
    pivot: (f64, f64),
    rotation_degrees: f64,
) {
    if rotation_degrees == 0.0 {
        imageops::overlay(canvas, layer, x as i64, y as i64);
        return;
    }

    let theta = rotation_degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (lw, lh) = (layer.width() as f64, layer.height() as f64);

    // Axis-aligned canvas bounds of the rotated layer.
    let corners = [
        (x as f64, y as f64),
        (x as f64 + lw, y as f64),
        (x as f64, y as f64 + lh),
        (x as f64 + lw, y as f64 + lh),
    ];
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (cx, cy) in corners {
        let dx = cx - pivot.0;
        let dy = cy - pivot.1;
        let rx = pivot.0 + dx * cos - dy * sin;
        let ry = pivot.1 + dx * sin + dy * cos;
        min_x = min_x.min(rx);
        min_y = min_y.min(ry);
        max_x = max_x.max(rx);
        max_y = max_y.max(ry);
    }

    let x0 = (min_x.floor() as i64).max(0) as u32;
    let y0 = (min_y.floor() as i64).max(0) as u32;
    let x1 = ((max_x.ceil() as i64).max(0) as u64).min(canvas.width() as u64) as u32;
    let y1 = ((max_y.ceil() as i64).max(0) as u64).min(canvas.height() as u64) as u32;

    trace!(
        "rotated overlay: {}x{} layer at ({}, {}), canvas rows {}..{}",
        layer.width(),
        layer.height(),
        x,
        y,
        y0,
        y1
    );

    for cy in y0..y1 {
        for cx in x0..x1 {
            // Inverse-rotate the pixel center into layer space.
            let dx = cx as f64 + 0.5 - pivot.0;
            let dy = cy as f64 + 0.5 - pivot.1;
            let ux = pivot.0 + dx * cos + dy * sin;
            let uy = pivot.1 - dx * sin + dy * cos;
            let lx = ux - x as f64;
            let ly = uy - y as f64;
            if let Some(src) = sample_bilinear(layer, lx, ly) {
                blend_pixel(canvas.get_pixel_mut(cx, cy), src);
            }
        }
    }
}

/// Bilinear sample at `(fx, fy)` in layer space, where pixel `(i, j)` is
/// centered at `(i + 0.5, j + 0.5)`. Taps outside the layer are fully
/// transparent; color channels are interpolated alpha-weighted so
/// transparent neighbors do not darken edges. Returns `None` when the
/// sample carries no coverage.
fn sample_bilinear(layer: &RgbaImage, fx: f64, fy: f64) -> Option<Rgba<u8>> {
    let sx = fx - 0.5;
    let sy = fy - 0.5;
    if sx <= -1.0 || sy <= -1.0 || sx >= layer.width() as f64 || sy >= layer.height() as f64 {
        return None;
    }

    let x0 = sx.floor();
    let y0 = sy.floor();
    let tx = sx - x0;
    let ty = sy - y0;

    let fetch = |ix: f64, iy: f64| -> [f64; 4] {
        if ix < 0.0 || iy < 0.0 || ix >= layer.width() as f64 || iy >= layer.height() as f64 {
            return [0.0; 4];
        }
        let px = layer.get_pixel(ix as u32, iy as u32);
        [px[0] as f64, px[1] as f64, px[2] as f64, px[3] as f64]
    };

    let taps = [
        ((1.0 - tx) * (1.0 - ty), fetch(x0, y0)),
        (tx * (1.0 - ty), fetch(x0 + 1.0, y0)),
        ((1.0 - tx) * ty, fetch(x0, y0 + 1.0)),
        (tx * ty, fetch(x0 + 1.0, y0 + 1.0)),
    ];

    let mut rgb = [0.0f64; 3];
    let mut alpha = 0.0f64;
    for (weight, px) in taps {
        let coverage = weight * px[3] / 255.0;
        rgb[0] += px[0] * coverage;
        rgb[1] += px[1] * coverage;
        rgb[2] += px[2] * coverage;
        alpha += weight * px[3];
    }
    if alpha < 0.5 {
        return None;
    }
    let norm = alpha / 255.0;
    Some(Rgba([
        (rgb[0] / norm).round().clamp(0.0, 255.0) as u8,
        (rgb[1] / norm).round().clamp(0.0, 255.0) as u8,
        (rgb[2] / norm).round().clamp(0.0, 255.0) as u8,
        alpha.round().clamp(0.0, 255.0) as u8,
    ]))
}

/// Straight-alpha source-over blend.
fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as f64 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for channel in 0..3 {
        let sc = src[channel] as f64;
        let dc = dst[channel] as f64;
        dst[channel] = ((sc * sa + dc * da * (1.0 - sa)) / out_a).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
