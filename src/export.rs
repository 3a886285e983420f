//! Tiled guide rendering and archive packaging.
//!
//! Slices a quantized grid into fixed-size chunks and renders each chunk as
//! an upscaled raster with gridlines, five-cell emphasis lines, and centered
//! palette-id labels, plus a small full-image overview and a plain-text
//! palette manifest. Everything lands in one deterministic ZIP archive.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use rayon::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::ExportError;
use crate::glyphs;
use crate::palette::hex_to_rgb;
use crate::quantize::PixelData;

/// Upscale factor of the no-label overview sheet.
pub const OVERVIEW_SCALE: u32 = 4;

/// Emphasis lines land after every fifth global row and column.
const EMPHASIS_EVERY: u32 = 5;

const GRID_COLOR: Rgb<u8> = Rgb([208, 208, 208]);
const EMPHASIS_COLOR: Rgb<u8> = Rgb([96, 96, 96]);

/// Pixel extent of one tile, clamped at the image boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileExtent {
    row: u32,
    col: u32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Renders the full guide archive for a quantized grid.
///
/// Entry order is fixed: tiles row-major (named `tile_r{row}_c{col}.png`,
/// 1-indexed), then `overview.png`, then `palette.txt`. A tile whose render
/// fails is logged and omitted; a failed overview is omitted; manifest and
/// archive failures abort the export.
pub fn export_guide(
    data: &PixelData,
    tile_size: u32,
    upscale: u32,
) -> Result<Vec<u8>, ExportError> {
    if tile_size == 0 || upscale == 0 {
        return Err(ExportError::InvalidTiling { tile_size, upscale });
    }
    let expected = data.width as usize * data.height as usize;
    if expected == 0 || data.colors.len() != expected {
        return Err(ExportError::MalformedPixelData);
    }

    let labels: HashMap<&str, String> = data
        .palette
        .iter()
        .map(|a| (a.hex.as_str(), a.index.to_string()))
        .collect();

    let extents = tile_extents(data.width, data.height, tile_size);
    let tiles: Vec<Option<(String, Vec<u8>)>> = extents
        .par_iter()
        .map(|extent| {
            let name = format!("tile_r{}_c{}.png", extent.row + 1, extent.col + 1);
            match render_tile(data, extent, upscale, &labels) {
                Ok(png) => Some((name, png)),
                Err(err) => {
                    log::warn!("skipping tile {}: {}", name, err);
                    None
                }
            }
        })
        .collect();

    let overview = match render_overview(data) {
        Ok(png) => Some(png),
        Err(err) => {
            log::warn!("omitting overview: {}", err);
            None
        }
    };

    let manifest = render_manifest(data);
    write_archive(tiles, overview, &manifest)
}

fn tile_extents(width: u32, height: u32, tile_size: u32) -> Vec<TileExtent> {
    let cols = width.div_ceil(tile_size);
    let rows = height.div_ceil(tile_size);
    let mut extents = Vec::with_capacity((rows * cols) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let x = col * tile_size;
            let y = row * tile_size;
            extents.push(TileExtent {
                row,
                col,
                x,
                y,
                width: tile_size.min(width - x),
                height: tile_size.min(height - y),
            });
        }
    }
    extents
}

/// Text color that stays readable on a colored block.
fn contrast_color(rgb: [u8; 3]) -> Rgb<u8> {
    let luminance = 0.299 * rgb[0] as f64 + 0.587 * rgb[1] as f64 + 0.114 * rgb[2] as f64;
    if luminance >= 128.0 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

fn render_tile(
    data: &PixelData,
    extent: &TileExtent,
    upscale: u32,
    labels: &HashMap<&str, String>,
) -> Result<Vec<u8>, image::ImageError> {
    let mut img = RgbImage::new(extent.width * upscale, extent.height * upscale);
    let emphasis = upscale.min(2);

    for local_y in 0..extent.height {
        for local_x in 0..extent.width {
            let global_x = extent.x + local_x;
            let global_y = extent.y + local_y;
            let hex = &data.colors[(global_y * data.width + global_x) as usize];
            let rgb = hex_to_rgb(hex).unwrap_or([0, 0, 0]);

            let block_x = (local_x * upscale) as i32;
            let block_y = (local_y * upscale) as i32;
            let block = Rect::at(block_x, block_y).of_size(upscale, upscale);
            draw_filled_rect_mut(&mut img, block, Rgb(rgb));
            draw_hollow_rect_mut(&mut img, block, GRID_COLOR);

            // Emphasis lines follow global image coordinates so they stay
            // aligned across tile boundaries.
            if (global_x + 1) % EMPHASIS_EVERY == 0 {
                let edge = Rect::at(block_x + (upscale - emphasis) as i32, block_y)
                    .of_size(emphasis, upscale);
                draw_filled_rect_mut(&mut img, edge, EMPHASIS_COLOR);
            }
            if (global_y + 1) % EMPHASIS_EVERY == 0 {
                let edge = Rect::at(block_x, block_y + (upscale - emphasis) as i32)
                    .of_size(upscale, emphasis);
                draw_filled_rect_mut(&mut img, edge, EMPHASIS_COLOR);
            }

            if let Some(label) = labels.get(hex.as_str()) {
                stamp_label(&mut img, label, block_x as u32, block_y as u32, upscale, rgb);
            }
        }
    }

    encode_png(img)
}

/// Centers the palette-id label in its block at the largest scale that fits;
/// blocks too small for even the 1x glyphs stay unlabeled.
fn stamp_label(
    img: &mut RgbImage,
    label: &str,
    block_x: u32,
    block_y: u32,
    upscale: u32,
    block_rgb: [u8; 3],
) {
    let base_w = glyphs::text_width(label, 1);
    let base_h = glyphs::text_height(1);
    if base_w == 0 || upscale <= 2 {
        return;
    }
    let scale = ((upscale - 2) / base_w).min((upscale - 2) / base_h);
    if scale == 0 {
        return;
    }

    let text_w = glyphs::text_width(label, scale);
    let text_h = glyphs::text_height(scale);
    let origin_x = block_x + (upscale - text_w) / 2;
    let origin_y = block_y + (upscale - text_h) / 2;
    let color = contrast_color(block_rgb);

    let (img_w, img_h) = img.dimensions();
    glyphs::for_each_text_pixel(label, scale, |dx, dy| {
        let px = origin_x + dx;
        let py = origin_y + dy;
        if px < img_w && py < img_h {
            img.put_pixel(px, py, color);
        }
    });
}

fn render_overview(data: &PixelData) -> Result<Vec<u8>, image::ImageError> {
    let mut img = RgbImage::new(data.width * OVERVIEW_SCALE, data.height * OVERVIEW_SCALE);
    for y in 0..data.height {
        for x in 0..data.width {
            let hex = &data.colors[(y * data.width + x) as usize];
            let rgb = hex_to_rgb(hex).unwrap_or([0, 0, 0]);
            let block = Rect::at((x * OVERVIEW_SCALE) as i32, (y * OVERVIEW_SCALE) as i32)
                .of_size(OVERVIEW_SCALE, OVERVIEW_SCALE);
            draw_filled_rect_mut(&mut img, block, Rgb(rgb));
        }
    }
    encode_png(img)
}

fn render_manifest(data: &PixelData) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Town palette guide: {}x{} px, {} colors\n\n",
        data.width,
        data.height,
        data.palette.len()
    ));
    out.push_str("rank  id      hex      pixels\n");
    for (i, entry) in data.palette.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<6}  {}  {:>6}\n",
            i + 1,
            entry.index.to_string(),
            entry.hex,
            entry.count
        ));
    }
    out
}

fn encode_png(img: RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Pinned timestamp keeps repeated exports byte-identical.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

fn write_archive(
    tiles: Vec<Option<(String, Vec<u8>)>>,
    overview: Option<Vec<u8>>,
    manifest: &str,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, bytes) in tiles.into_iter().flatten() {
        writer.start_file(name, entry_options())?;
        writer.write_all(&bytes)?;
    }
    if let Some(bytes) = overview {
        writer.start_file("overview.png", entry_options())?;
        writer.write_all(&bytes)?;
    }
    writer.start_file("palette.txt", entry_options())?;
    writer.write_all(manifest.as_bytes())?;

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::quantize;
    use image::{Rgb, RgbImage};
    use zip::ZipArchive;

    fn sample_data(width: u32, height: u32) -> PixelData {
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([200, 30, 40]));
        if width > 1 && height > 1 {
            canvas.put_pixel(0, 0, Rgb([20, 20, 200]));
            canvas.put_pixel(width - 1, height - 1, Rgb([40, 150, 20]));
        }
        quantize(&canvas, 64).unwrap()
    }

    #[test]
    fn test_tile_extents_cover_grid_exactly() {
        for (w, h, tile) in [(7u32, 5u32, 3u32), (10, 10, 5), (1, 1, 4), (9, 4, 4)] {
            let extents = tile_extents(w, h, tile);
            let cols = w.div_ceil(tile);
            let rows = h.div_ceil(tile);
            assert_eq!(extents.len() as u32, cols * rows);
            assert!(cols * tile >= w);
            assert!(rows * tile >= h);

            // Union covers every pixel exactly once.
            let mut seen = vec![0u32; (w * h) as usize];
            for e in &extents {
                assert!(e.width > 0 && e.height > 0);
                for y in e.y..e.y + e.height {
                    for x in e.x..e.x + e.width {
                        seen[(y * w + x) as usize] += 1;
                    }
                }
            }
            assert!(seen.iter().all(|&n| n == 1), "{}x{} tile {}", w, h, tile);
        }
    }

    #[test]
    fn test_contrast_label_colors() {
        assert_eq!(contrast_color([0, 0, 0]), Rgb([255, 255, 255]));
        assert_eq!(contrast_color([255, 255, 255]), Rgb([0, 0, 0]));
        // Luminance of an even gray equals its channel value; 128 sits
        // exactly on the boundary and flips to black text.
        assert_eq!(contrast_color([128, 128, 128]), Rgb([0, 0, 0]));
        assert_eq!(contrast_color([127, 127, 127]), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_archive_entry_names_and_order() {
        let data = sample_data(7, 5);
        let bytes = export_guide(&data, 3, 8).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(
            names,
            vec![
                "tile_r1_c1.png",
                "tile_r1_c2.png",
                "tile_r1_c3.png",
                "tile_r2_c1.png",
                "tile_r2_c2.png",
                "tile_r2_c3.png",
                "overview.png",
                "palette.txt",
            ]
        );
    }

    #[test]
    fn test_export_is_idempotent() {
        let data = sample_data(6, 6);
        let first = export_guide(&data, 4, 16).unwrap();
        let second = export_guide(&data, 4, 16).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_tiling_rejected() {
        let data = sample_data(4, 4);
        assert!(matches!(
            export_guide(&data, 0, 8),
            Err(ExportError::InvalidTiling { .. })
        ));
        assert!(matches!(
            export_guide(&data, 4, 0),
            Err(ExportError::InvalidTiling { .. })
        ));
    }

    #[test]
    fn test_malformed_pixel_data_rejected() {
        let mut data = sample_data(4, 4);
        data.colors.pop();
        assert!(matches!(
            export_guide(&data, 4, 8),
            Err(ExportError::MalformedPixelData)
        ));
    }

    #[test]
    fn test_manifest_lists_active_palette() {
        let data = sample_data(4, 4);
        let manifest = render_manifest(&data);
        let mut lines = manifest.lines();
        assert_eq!(lines.next(), Some("Town palette guide: 4x4 px, 3 colors"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("rank  id      hex      pixels"));

        let body: Vec<&str> = lines.collect();
        assert_eq!(body.len(), data.palette.len());
        for (line, entry) in body.iter().zip(&data.palette) {
            assert!(line.contains(&entry.index.to_string()));
            assert!(line.contains(&entry.hex));
            assert!(line.contains(&entry.count.to_string()));
        }
    }

    #[test]
    fn test_tile_blocks_carry_pixel_colors() {
        // Single 2x2 tile at upscale 4; block interiors (away from grid and
        // emphasis overdraw) must show the quantized colors.
        let data = sample_data(2, 2);
        let extents = tile_extents(2, 2, 2);
        let labels = HashMap::new();
        let png = render_tile(&data, &extents[0], 4, &labels).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (8, 8));

        for y in 0..2u32 {
            for x in 0..2u32 {
                let hex = &data.colors[(y * 2 + x) as usize];
                let rgb = hex_to_rgb(hex).unwrap();
                assert_eq!(img.get_pixel(x * 4 + 1, y * 4 + 1).0, rgb);
            }
        }
    }

    #[test]
    fn test_overview_has_no_gridlines() {
        let data = sample_data(3, 3);
        let png = render_overview(&data).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(
            img.dimensions(),
            (3 * OVERVIEW_SCALE, 3 * OVERVIEW_SCALE)
        );
        // Every rendered pixel is a palette color, nothing else.
        for pixel in img.pixels() {
            let hex = crate::palette::rgb_to_hex(pixel.0);
            assert!(data.colors.contains(&hex), "unexpected color {}", hex);
        }
    }
}
