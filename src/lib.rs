//! Pixel-art conversion engine for the fixed in-game town palette.
//!
//! Turns a source image plus crop and text-overlay geometry into a grid of
//! indexed pixels drawn from the 160-color town palette, and renders tiled,
//! annotated guide sheets for recreating the result in game.
//!
//! Processing is entirely in-memory: callers hand bytes and geometry in and
//! get a [`PixelData`] back, then may ask for a guide archive of the result.
//! Heavy per-pixel and per-tile work is parallelized with rayon without
//! affecting determinism.

pub mod compose;
pub mod distance;
pub mod error;
pub mod export;
pub mod glyphs;
pub mod palette;
pub mod quantize;

pub use compose::{compose_canvas, CropTransform, TextLayer};
pub use distance::color_distance;
pub use error::{ConvertError, ExportError};
pub use export::{export_guide, OVERVIEW_SCALE};
pub use palette::{PaletteEntry, PaletteId, TownPalette};
pub use quantize::{
    convert_image, quantize, ActiveColor, ConvertConfig, PixelData, DEFAULT_COLOR_LIMIT,
};
