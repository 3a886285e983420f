//! Canvas composition ahead of quantization.
//!
//! Builds the fixed-size composite the quantizer reads: an opaque white
//! base, the source image placed through the user's crop transform, and any
//! text overlays stamped on top. Text pixels are quantized along with the
//! image; that is the intended behavior, not an oversight.

use image::imageops::FilterType;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::glyphs;
use crate::palette::hex_to_rgb;

/// Guard against absurd canvas allocations standing in for surface limits.
const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// User-controlled offset and scale applied when placing the source image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for CropTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

/// A text overlay positioned in percent of the canvas, sized in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: String,
}

/// Composites source and text layers onto a `width` x `height` canvas.
///
/// Transparent source pixels blend against the white base so they resolve
/// predictably downstream. Negative crop offsets clip at the canvas edge.
pub fn compose_canvas(
    source: &DynamicImage,
    width: u32,
    height: u32,
    crop: &CropTransform,
    layers: &[TextLayer],
) -> Result<RgbImage, ConvertError> {
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidDimensions { width, height });
    }
    if width as u64 * height as u64 > MAX_CANVAS_PIXELS {
        return Err(ConvertError::RenderingUnavailable { width, height });
    }
    if !crop.x.is_finite() || !crop.y.is_finite() || !crop.scale.is_finite() || crop.scale <= 0.0 {
        return Err(ConvertError::InvalidGeometry);
    }
    for layer in layers {
        if !layer.x.is_finite() || !layer.y.is_finite() || !layer.size.is_finite() {
            return Err(ConvertError::InvalidGeometry);
        }
    }

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    let (src_w, src_h) = (source.width(), source.height());
    if src_w > 0 && src_h > 0 {
        let dest_w = ((src_w as f64 * crop.scale).round() as u32).max(1);
        let dest_h = ((src_h as f64 * crop.scale).round() as u32).max(1);
        // Fast path - no scaling required.
        let scaled = if dest_w == src_w && dest_h == src_h {
            source.to_rgba8()
        } else {
            source.resize_exact(dest_w, dest_h, FilterType::Triangle).to_rgba8()
        };
        imageops::overlay(&mut canvas, &scaled, crop.x.round() as i64, crop.y.round() as i64);
    }

    for layer in layers {
        draw_text_layer(&mut canvas, layer);
    }

    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

fn draw_text_layer(canvas: &mut RgbaImage, layer: &TextLayer) {
    let rgb = hex_to_rgb(&layer.color).unwrap_or([0, 0, 0]);
    let scale = ((layer.size / glyphs::GLYPH_HEIGHT as f64).round() as u32).max(1);
    let (width, height) = canvas.dimensions();
    let origin_x = (layer.x / 100.0 * width as f64).round() as i64;
    let origin_y = (layer.y / 100.0 * height as f64).round() as i64;

    glyphs::for_each_text_pixel(&layer.text, scale, |dx, dy| {
        let px = origin_x + dx as i64;
        let py = origin_y + dy as i64;
        if (0..width as i64).contains(&px) && (0..height as i64).contains(&py) {
            canvas.put_pixel(px as u32, py as u32, Rgba([rgb[0], rgb[1], rgb[2], 255]));
        }
    });
}
