//! Static town palette table and nearest-color resolution.
//!
//! The in-game painter offers a fixed universe of 160 colors arranged in 16
//! hue groups of 10 shade slots. Every conversion resolves image pixels
//! against this table; declaration order below is part of the contract, since
//! nearest-color ties go to the earliest row.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::distance::color_distance;
use crate::quantize::ActiveColor;

/// Identifier of one fixed in-game color: hue group plus shade slot.
///
/// Displays and parses as `"<group>-<slot>"`, e.g. `"10-3"`. Ordering is
/// `(group, slot)` ascending, which is also the stable display order of an
/// active palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaletteId {
    pub group: u8,
    pub slot: u8,
}

impl fmt::Display for PaletteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.group, self.slot)
    }
}

#[derive(Debug, Error)]
#[error("invalid palette id: {0:?}")]
pub struct ParsePaletteIdError(String);

impl FromStr for PaletteId {
    type Err = ParsePaletteIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, slot) = s
            .split_once('-')
            .ok_or_else(|| ParsePaletteIdError(s.to_string()))?;
        let group = group
            .parse()
            .map_err(|_| ParsePaletteIdError(s.to_string()))?;
        let slot = slot
            .parse()
            .map_err(|_| ParsePaletteIdError(s.to_string()))?;
        Ok(Self { group, slot })
    }
}

impl Serialize for PaletteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaletteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// One entry of the fixed table with its derived hex form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteEntry {
    pub id: PaletteId,
    pub rgb: [u8; 3],
    pub hex: String,
}

/// Complete town palette: (group, slot, rgb), 16 groups x 10 slots.
///
/// The RGB triple is canonical; hex strings are derived at startup. The
/// lightest entry is 1-5 and the darkest 16-10, which the quantizer's
/// near-white and near-black clamps snap onto.
const TOWN_PALETTE: &[(u8, u8, [u8; 3])] = &[
    // Whites & creams
    (1, 1, [255, 217, 224]),
    (1, 2, [255, 231, 234]),
    (1, 3, [255, 243, 240]),
    (1, 4, [255, 250, 245]),
    (1, 5, [254, 255, 255]),
    (1, 6, [242, 239, 233]),
    (1, 7, [228, 224, 216]),
    (1, 8, [214, 208, 198]),
    (1, 9, [197, 190, 178]),
    (1, 10, [179, 171, 158]),
    // Reds
    (2, 1, [243, 191, 191]),
    (2, 2, [235, 152, 152]),
    (2, 3, [228, 114, 114]),
    (2, 4, [221, 75, 75]),
    (2, 5, [214, 41, 41]),
    (2, 6, [184, 35, 35]),
    (2, 7, [154, 29, 29]),
    (2, 8, [124, 24, 24]),
    (2, 9, [99, 19, 19]),
    (2, 10, [73, 14, 14]),
    // Oranges
    (3, 1, [243, 212, 191]),
    (3, 2, [235, 185, 152]),
    (3, 3, [228, 159, 114]),
    (3, 4, [221, 133, 75]),
    (3, 5, [214, 110, 41]),
    (3, 6, [184, 95, 35]),
    (3, 7, [154, 79, 29]),
    (3, 8, [124, 64, 24]),
    (3, 9, [99, 51, 19]),
    (3, 10, [73, 37, 14]),
    // Yellows
    (4, 1, [243, 236, 191]),
    (4, 2, [235, 224, 152]),
    (4, 3, [228, 213, 114]),
    (4, 4, [221, 201, 75]),
    (4, 5, [214, 191, 41]),
    (4, 6, [184, 164, 35]),
    (4, 7, [154, 138, 29]),
    (4, 8, [124, 111, 24]),
    (4, 9, [99, 88, 19]),
    (4, 10, [73, 65, 14]),
    // Chartreuse
    (5, 1, [221, 243, 191]),
    (5, 2, [201, 235, 152]),
    (5, 3, [180, 228, 114]),
    (5, 4, [160, 221, 75]),
    (5, 5, [142, 214, 41]),
    (5, 6, [122, 184, 35]),
    (5, 7, [102, 154, 29]),
    (5, 8, [82, 124, 24]),
    (5, 9, [65, 99, 19]),
    (5, 10, [48, 73, 14]),
    // Greens
    (6, 1, [191, 243, 191]),
    (6, 2, [152, 235, 152]),
    (6, 3, [114, 228, 114]),
    (6, 4, [75, 221, 75]),
    (6, 5, [41, 214, 41]),
    (6, 6, [35, 184, 35]),
    (6, 7, [29, 154, 29]),
    (6, 8, [24, 124, 24]),
    (6, 9, [19, 99, 19]),
    (6, 10, [14, 73, 14]),
    // Sea greens
    (7, 1, [191, 243, 221]),
    (7, 2, [152, 235, 201]),
    (7, 3, [114, 228, 180]),
    (7, 4, [75, 221, 160]),
    (7, 5, [41, 214, 142]),
    (7, 6, [35, 184, 122]),
    (7, 7, [29, 154, 102]),
    (7, 8, [24, 124, 82]),
    (7, 9, [19, 99, 65]),
    (7, 10, [14, 73, 48]),
    // Cyans
    (8, 1, [191, 243, 243]),
    (8, 2, [152, 235, 235]),
    (8, 3, [114, 228, 228]),
    (8, 4, [75, 221, 221]),
    (8, 5, [41, 214, 214]),
    (8, 6, [35, 184, 184]),
    (8, 7, [29, 154, 154]),
    (8, 8, [24, 124, 124]),
    (8, 9, [19, 99, 99]),
    (8, 10, [14, 73, 73]),
    // Sky blues
    (9, 1, [191, 221, 243]),
    (9, 2, [152, 201, 235]),
    (9, 3, [114, 180, 228]),
    (9, 4, [75, 160, 221]),
    (9, 5, [41, 142, 214]),
    (9, 6, [35, 122, 184]),
    (9, 7, [29, 102, 154]),
    (9, 8, [24, 82, 124]),
    (9, 9, [19, 65, 99]),
    (9, 10, [14, 48, 73]),
    // Blues
    (10, 1, [191, 204, 243]),
    (10, 2, [152, 173, 235]),
    (10, 3, [114, 142, 228]),
    (10, 4, [75, 111, 221]),
    (10, 5, [41, 84, 214]),
    (10, 6, [35, 72, 184]),
    (10, 7, [29, 61, 154]),
    (10, 8, [24, 49, 124]),
    (10, 9, [19, 39, 99]),
    (10, 10, [14, 29, 73]),
    // Indigos
    (11, 1, [204, 191, 243]),
    (11, 2, [173, 152, 235]),
    (11, 3, [142, 114, 228]),
    (11, 4, [111, 75, 221]),
    (11, 5, [84, 41, 214]),
    (11, 6, [72, 35, 184]),
    (11, 7, [61, 29, 154]),
    (11, 8, [49, 24, 124]),
    (11, 9, [39, 19, 99]),
    (11, 10, [29, 14, 73]),
    // Purples
    (12, 1, [225, 191, 243]),
    (12, 2, [208, 152, 235]),
    (12, 3, [190, 114, 228]),
    (12, 4, [172, 75, 221]),
    (12, 5, [156, 41, 214]),
    (12, 6, [135, 35, 184]),
    (12, 7, [113, 29, 154]),
    (12, 8, [91, 24, 124]),
    (12, 9, [72, 19, 99]),
    (12, 10, [53, 14, 73]),
    // Magentas
    (13, 1, [243, 191, 225]),
    (13, 2, [235, 152, 208]),
    (13, 3, [228, 114, 190]),
    (13, 4, [221, 75, 172]),
    (13, 5, [214, 41, 156]),
    (13, 6, [184, 35, 135]),
    (13, 7, [154, 29, 113]),
    (13, 8, [124, 24, 91]),
    (13, 9, [99, 19, 72]),
    (13, 10, [73, 14, 53]),
    // Browns
    (14, 1, [224, 197, 174]),
    (14, 2, [214, 179, 148]),
    (14, 3, [205, 160, 122]),
    (14, 4, [195, 142, 96]),
    (14, 5, [185, 124, 70]),
    (14, 6, [159, 106, 60]),
    (14, 7, [133, 89, 50]),
    (14, 8, [107, 72, 41]),
    (14, 9, [81, 54, 31]),
    (14, 10, [55, 37, 21]),
    // Grays
    (15, 1, [235, 235, 235]),
    (15, 2, [212, 212, 212]),
    (15, 3, [189, 189, 189]),
    (15, 4, [167, 167, 167]),
    (15, 5, [144, 144, 144]),
    (15, 6, [121, 121, 121]),
    (15, 7, [99, 99, 99]),
    (15, 8, [76, 76, 76]),
    (15, 9, [53, 53, 53]),
    (15, 10, [31, 31, 31]),
    // Deep tones
    (16, 1, [74, 21, 32]),
    (16, 2, [60, 42, 18]),
    (16, 3, [20, 56, 30]),
    (16, 4, [15, 48, 58]),
    (16, 5, [19, 28, 70]),
    (16, 6, [44, 18, 68]),
    (16, 7, [58, 15, 46]),
    (16, 8, [38, 38, 46]),
    (16, 9, [16, 16, 32]),
    (16, 10, [5, 22, 22]),
];

/// Cached palette with derived hex strings and an id index.
pub struct TownPalette {
    entries: Vec<PaletteEntry>,
    by_id: HashMap<PaletteId, usize>,
}

static CACHED_PALETTE: OnceLock<TownPalette> = OnceLock::new();

impl TownPalette {
    pub fn global() -> &'static Self {
        CACHED_PALETTE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let entries: Vec<PaletteEntry> = TOWN_PALETTE
            .iter()
            .map(|&(group, slot, rgb)| PaletteEntry {
                id: PaletteId { group, slot },
                rgb,
                hex: rgb_to_hex(rgb),
            })
            .collect();
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        Self { entries, by_id }
    }

    /// All entries in declaration order.
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn lookup_rgb(&self, id: PaletteId) -> Option<[u8; 3]> {
        self.by_id.get(&id).map(|&i| self.entries[i].rgb)
    }

    pub fn lookup_hex(&self, id: PaletteId) -> Option<&str> {
        self.by_id.get(&id).map(|&i| self.entries[i].hex.as_str())
    }

    /// All palette ids in declaration order.
    pub fn all_ids(&self) -> impl Iterator<Item = PaletteId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Nearest table entry to a sampled pixel.
    ///
    /// Sequential scan in declaration order with a strict comparison, so a
    /// tie keeps the earliest declared entry.
    pub fn closest_full_palette(&self, sample: [u8; 3]) -> PaletteId {
        let mut best = self.entries[0].id;
        let mut best_dist = f64::MAX;
        for entry in &self.entries {
            let dist = color_distance(sample, entry.rgb);
            if dist < best_dist {
                best_dist = dist;
                best = entry.id;
            }
        }
        best
    }

    /// Nearest hex among the active entries for a pixel whose true nearest
    /// color did not make the cut.
    ///
    /// An empty active set falls back to the first declared entry's hex; it
    /// cannot arise when the set was derived from the same image.
    pub fn closest_in_active(&self, source: PaletteId, active: &[ActiveColor]) -> String {
        let Some(rgb) = self.lookup_rgb(source) else {
            return self.entries[0].hex.clone();
        };
        let mut best: Option<&ActiveColor> = None;
        let mut best_dist = f64::MAX;
        for candidate in active {
            let Some(candidate_rgb) = self.lookup_rgb(candidate.index) else {
                continue;
            };
            let dist = color_distance(rgb, candidate_rgb);
            if dist < best_dist {
                best_dist = dist;
                best = Some(candidate);
            }
        }
        match best {
            Some(c) => c.hex.clone(),
            None => self.entries[0].hex.clone(),
        }
    }
}

/// Uppercase two-digit hex form of an RGB triple, no alpha.
pub(crate) fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

pub(crate) fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    let trimmed = hex.trim_start_matches('#');
    if trimmed.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&trimmed[0..2], 16).ok()?;
    let g = u8::from_str_radix(&trimmed[2..4], 16).ok()?;
    let b = u8::from_str_radix(&trimmed[4..6], 16).ok()?;
    Some([r, g, b])
}
