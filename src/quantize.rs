//! Two-pass quantization pipeline.
//!
//! Pass one maps every canvas pixel to its nearest entry in the full town
//! palette and tallies frequencies. The top `color_limit` ids by frequency
//! become the active palette; pass two rewrites every pixel whose true
//! nearest color missed the cut to the closest active substitute. The
//! stages are plain functions over plain data so each is testable alone.

use std::collections::{BTreeMap, HashMap};

use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compose::{compose_canvas, CropTransform, TextLayer};
use crate::error::ConvertError;
use crate::palette::{PaletteId, TownPalette};

/// Active-palette size used by the studio UI.
pub const DEFAULT_COLOR_LIMIT: usize = 64;

/// Near-white pixels snap here; the table's lightest entry, not pure white.
const NEAR_WHITE: [u8; 3] = [254, 255, 255];
/// Near-black pixels snap here; the table's darkest entry, not pure black.
const NEAR_BLACK: [u8; 3] = [5, 22, 22];

/// One color of the active palette.
///
/// `count` is the tally from the full-palette pass: how much of the original
/// image this true color covered. Remapping can only grow the number of
/// output pixels showing this hex, so the two figures are allowed to differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveColor {
    pub index: PaletteId,
    pub hex: String,
    pub count: u32,
}

/// Result of one quantization run.
///
/// `colors` is row-major, one uppercase hex string per pixel; every value is
/// the hex of some entry in `palette`, which is sorted by `(group, slot)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelData {
    pub width: u32,
    pub height: u32,
    pub colors: Vec<String>,
    pub palette: Vec<ActiveColor>,
}

/// Input of the high-level conversion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    #[serde(default)]
    pub crop: CropTransform,
    #[serde(default)]
    pub text_layers: Vec<TextLayer>,
    #[serde(default = "default_color_limit")]
    pub color_limit: usize,
}

fn default_color_limit() -> usize {
    DEFAULT_COLOR_LIMIT
}

/// Decode, composite, and quantize a source image in one call.
pub fn convert_image(image_bytes: &[u8], config: &ConvertConfig) -> Result<PixelData, ConvertError> {
    log::info!(
        "converting image: {} bytes, {}x{} canvas, {} text layers, limit {}",
        image_bytes.len(),
        config.canvas_width,
        config.canvas_height,
        config.text_layers.len(),
        config.color_limit
    );

    let source = image::load_from_memory(image_bytes)?;
    let canvas = compose_canvas(
        &source,
        config.canvas_width,
        config.canvas_height,
        &config.crop,
        &config.text_layers,
    )?;
    let result = quantize(&canvas, config.color_limit)?;

    log::info!(
        "quantized: {}x{}, {} active colors",
        result.width,
        result.height,
        result.palette.len()
    );
    Ok(result)
}

/// Quantize an already-composited canvas against the town palette.
pub fn quantize(canvas: &RgbImage, color_limit: usize) -> Result<PixelData, ConvertError> {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidDimensions { width, height });
    }

    let ids = map_full_palette(canvas);
    let tally = tally_ids(&ids);
    let palette = select_active(&tally, color_limit);
    let colors = remap_to_active(&ids, &palette);

    Ok(PixelData {
        width,
        height,
        colors,
        palette,
    })
}

/// Anti-aliased edges round toward the table's actual endpoints rather than
/// an unreachable true white or black.
fn clamp_extremes(rgb: [u8; 3]) -> [u8; 3] {
    if rgb.iter().all(|&c| c > 250) {
        NEAR_WHITE
    } else if rgb.iter().all(|&c| c < 5) {
        NEAR_BLACK
    } else {
        rgb
    }
}

/// Pass one: nearest full-palette id per pixel, row-major.
///
/// Pixels resolve independently in parallel; the per-pixel scan itself stays
/// sequential so tie-breaking follows table declaration order.
pub(crate) fn map_full_palette(canvas: &RgbImage) -> Vec<PaletteId> {
    let town = TownPalette::global();
    let pixels: Vec<[u8; 3]> = canvas.pixels().map(|p| p.0).collect();
    pixels
        .par_iter()
        .map(|&rgb| town.closest_full_palette(clamp_extremes(rgb)))
        .collect()
}

/// Frequency of every observed id. Keyed by a `BTreeMap` so downstream
/// ranking never depends on hash iteration order.
pub(crate) fn tally_ids(ids: &[PaletteId]) -> BTreeMap<PaletteId, u32> {
    let mut tally = BTreeMap::new();
    for id in ids {
        *tally.entry(*id).or_insert(0u32) += 1;
    }
    tally
}

/// Rank by frequency descending (ties to the lower id), keep the top
/// `color_limit`, then re-sort ascending by `(group, slot)` for display.
pub(crate) fn select_active(tally: &BTreeMap<PaletteId, u32>, color_limit: usize) -> Vec<ActiveColor> {
    let town = TownPalette::global();
    let mut ranked: Vec<(PaletteId, u32)> = tally.iter().map(|(&id, &n)| (id, n)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(color_limit);
    ranked.sort_by_key(|&(id, _)| id);

    ranked
        .into_iter()
        .map(|(id, count)| ActiveColor {
            index: id,
            hex: town.lookup_hex(id).unwrap_or_default().to_string(),
            count,
        })
        .collect()
}

/// Pass two: pixels whose id survived keep its hex; the rest substitute the
/// nearest active color. Substitutions are resolved once per missing id.
pub(crate) fn remap_to_active(ids: &[PaletteId], active: &[ActiveColor]) -> Vec<String> {
    let town = TownPalette::global();
    let by_id: HashMap<PaletteId, &str> = active.iter().map(|a| (a.index, a.hex.as_str())).collect();
    let mut substitutes: HashMap<PaletteId, String> = HashMap::new();

    ids.iter()
        .map(|id| match by_id.get(id) {
            Some(hex) => (*hex).to_string(),
            None => substitutes
                .entry(*id)
                .or_insert_with(|| town.closest_in_active(*id, active))
                .clone(),
        })
        .collect()
}
