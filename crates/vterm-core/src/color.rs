//! Color types and palette lookup
//!
//! Cells store colors as 256-color palette indices (see [`crate::cell`]).
//! This module provides:
//! - RGB values and the rendering palette
//! - the standard 256-color table (16 ANSI + 6x6x6 cube + grayscale ramp)
//! - [`PaletteMatcher`], which maps 24-bit colors from SGR 38/48;2
//!   sequences to the nearest palette index

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// RGB color value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse from hex string like "#RRGGBB" or "RRGGBB"
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Convert to normalized float values (0.0-1.0)
    pub fn to_f64(&self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }
}

/// Color palette for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorPalette {
    /// 16 ANSI colors
    pub ansi: [Rgb; 16],
    /// Default foreground color
    pub foreground: Rgb,
    /// Default background color
    pub background: Rgb,
    /// Cursor color
    pub cursor: Rgb,
    /// Selection background color
    pub selection: Rgb,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::default_dark()
    }
}

impl ColorPalette {
    /// Default dark theme palette
    pub fn default_dark() -> Self {
        Self {
            ansi: [
                Rgb::new(0x1d, 0x1f, 0x21), // Black
                Rgb::new(0xcc, 0x66, 0x66), // Red
                Rgb::new(0xb5, 0xbd, 0x68), // Green
                Rgb::new(0xf0, 0xc6, 0x74), // Yellow
                Rgb::new(0x81, 0xa2, 0xbe), // Blue
                Rgb::new(0xb2, 0x94, 0xbb), // Magenta
                Rgb::new(0x8a, 0xbe, 0xb7), // Cyan
                Rgb::new(0xc5, 0xc8, 0xc6), // White
                Rgb::new(0x96, 0x98, 0x96), // Bright Black
                Rgb::new(0xde, 0x93, 0x5f), // Bright Red
                Rgb::new(0xb5, 0xbd, 0x68), // Bright Green
                Rgb::new(0xf0, 0xc6, 0x74), // Bright Yellow
                Rgb::new(0x81, 0xa2, 0xbe), // Bright Blue
                Rgb::new(0xb2, 0x94, 0xbb), // Bright Magenta
                Rgb::new(0x8a, 0xbe, 0xb7), // Bright Cyan
                Rgb::new(0xff, 0xff, 0xff), // Bright White
            ],
            foreground: Rgb::new(0xc5, 0xc8, 0xc6),
            background: Rgb::new(0x1d, 0x1f, 0x21),
            cursor: Rgb::new(0xc5, 0xc8, 0xc6),
            selection: Rgb::new(0x37, 0x3b, 0x41),
        }
    }

    /// Default light theme palette
    pub fn default_light() -> Self {
        Self {
            ansi: [
                Rgb::new(0x00, 0x00, 0x00), // Black
                Rgb::new(0xc8, 0x28, 0x29), // Red
                Rgb::new(0x71, 0x8c, 0x00), // Green
                Rgb::new(0xec, 0xa4, 0x00), // Yellow
                Rgb::new(0x25, 0x6f, 0xef), // Blue
                Rgb::new(0x77, 0x59, 0xc8), // Magenta
                Rgb::new(0x00, 0x97, 0xa7), // Cyan
                Rgb::new(0x65, 0x7b, 0x83), // White
                Rgb::new(0x58, 0x6e, 0x75), // Bright Black
                Rgb::new(0xcb, 0x4b, 0x16), // Bright Red
                Rgb::new(0x85, 0x99, 0x00), // Bright Green
                Rgb::new(0xb5, 0x89, 0x00), // Bright Yellow
                Rgb::new(0x26, 0x8b, 0xd2), // Bright Blue
                Rgb::new(0x6c, 0x71, 0xc4), // Bright Magenta
                Rgb::new(0x2a, 0xa1, 0x98), // Bright Cyan
                Rgb::new(0xfd, 0xf6, 0xe3), // Bright White
            ],
            foreground: Rgb::new(0x00, 0x00, 0x00),
            background: Rgb::new(0xff, 0xff, 0xff),
            cursor: Rgb::new(0x00, 0x00, 0x00),
            selection: Rgb::new(0xee, 0xe8, 0xd5),
        }
    }
}

/// Convert 256-color index to RGB
pub fn index_to_rgb(index: u8, palette: &ColorPalette) -> Rgb {
    match index {
        // Standard ANSI colors (0-15)
        0..=15 => palette.ansi[index as usize],
        // 216-color cube (16-231)
        16..=231 => {
            let idx = index - 16;
            let r = (idx / 36) % 6;
            let g = (idx / 6) % 6;
            let b = idx % 6;

            let to_component = |c: u8| -> u8 {
                if c == 0 {
                    0
                } else {
                    55 + c * 40
                }
            };

            Rgb::new(to_component(r), to_component(g), to_component(b))
        }
        // Grayscale (232-255)
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            Rgb::new(gray, gray, gray)
        }
    }
}

/// Maps 24-bit colors to the nearest 256-color palette index.
///
/// Built from a [`ColorPalette`] so the 16 ANSI slots match the active
/// theme. Lookups are memoized per matcher; terminals with different
/// palettes hold separate matchers.
#[derive(Debug, Clone)]
pub struct PaletteMatcher {
    table: [Rgb; 256],
    cache: HashMap<u32, u8>,
}

impl PaletteMatcher {
    pub fn new(palette: &ColorPalette) -> Self {
        let mut table = [Rgb::default(); 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = index_to_rgb(i as u8, palette);
        }
        Self {
            table,
            cache: HashMap::new(),
        }
    }

    /// Nearest palette index for an arbitrary RGB value.
    pub fn nearest(&mut self, color: Rgb) -> u8 {
        let key = ((color.r as u32) << 16) | ((color.g as u32) << 8) | color.b as u32;
        if let Some(&idx) = self.cache.get(&key) {
            return idx;
        }
        let mut best = 0u8;
        let mut best_distance = u32::MAX;
        for (i, candidate) in self.table.iter().enumerate() {
            let d = color_distance(color, *candidate);
            if d < best_distance {
                best_distance = d;
                best = i as u8;
                if d == 0 {
                    break;
                }
            }
        }
        self.cache.insert(key, best);
        best
    }
}

/// Perceptually weighted squared distance (luma weights 30/59/11).
fn color_distance(a: Rgb, b: Rgb) -> u32 {
    let dr = 30 * (a.r as i32 - b.r as i32);
    let dg = 59 * (a.g as i32 - b.g as i32);
    let db = 11 * (a.b as i32 - b.b as i32);
    (dr * dr + dg * dg + db * db) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("#ff0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(Rgb::from_hex("00ff00"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(Rgb::from_hex("#invalid"), None);
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(Rgb::new(255, 0, 0).to_hex(), "#ff0000");
        assert_eq!(Rgb::new(0, 255, 0).to_hex(), "#00ff00");
    }

    #[test]
    fn test_index_to_rgb() {
        let palette = ColorPalette::default();
        // First ANSI color
        assert_eq!(index_to_rgb(0, &palette), palette.ansi[0]);
        // 216 color cube - pure red
        let red = index_to_rgb(196, &palette);
        assert_eq!(red, Rgb::new(255, 0, 0));
        // Grayscale
        let gray = index_to_rgb(244, &palette);
        assert_eq!(gray.r, gray.g);
        assert_eq!(gray.g, gray.b);
    }

    #[test]
    fn test_matcher_exact() {
        let mut matcher = PaletteMatcher::new(&ColorPalette::default());
        // 196 is pure red in the 256-color cube
        assert_eq!(matcher.nearest(Rgb::new(255, 0, 0)), 196);
        // 16 is cube black
        assert_eq!(matcher.nearest(Rgb::new(0, 0, 0)), 16);
    }

    #[test]
    fn test_matcher_near() {
        let mut matcher = PaletteMatcher::new(&ColorPalette::default());
        let idx = matcher.nearest(Rgb::new(250, 5, 3));
        assert_eq!(idx, 196);
    }

    #[test]
    fn test_matcher_caches() {
        let mut matcher = PaletteMatcher::new(&ColorPalette::default());
        let first = matcher.nearest(Rgb::new(123, 45, 67));
        assert!(matcher.cache.contains_key(&((123 << 16) | (45 << 8) | 67)));
        assert_eq!(matcher.nearest(Rgb::new(123, 45, 67)), first);
    }

    #[test]
    fn test_matcher_follows_palette() {
        let mut dark = PaletteMatcher::new(&ColorPalette::default_dark());
        let mut light = PaletteMatcher::new(&ColorPalette::default_light());
        // The dark theme's ANSI red sits at index 1 for the dark matcher
        // but quantizes elsewhere under the light theme's table.
        let dark_red = ColorPalette::default_dark().ansi[1];
        assert_eq!(dark.nearest(dark_red), 1);
        assert_ne!(light.nearest(dark_red), 1);
    }
}
