//! Terminal cell types
//!
//! A cell holds one character position in the grid. Styling is packed
//! into a single 32-bit word so rows stay compact and comparisons stay
//! cheap: `flags << 18 | fg << 9 | bg`, where fg and bg are 9-bit
//! fields holding a 256-color palette index or [`DEFAULT_COLOR`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Sentinel color index meaning "use the terminal default".
///
/// Both color fields are 9 bits wide, so 0-255 are palette indices and
/// 256 is the default for foreground and background alike.
pub const DEFAULT_COLOR: u16 = 256;

bitflags! {
    /// Cell rendering attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AttrFlags: u16 {
        /// Bold/bright text
        const BOLD = 1 << 0;
        /// Underlined text
        const UNDERLINE = 1 << 1;
        /// Blinking text
        const BLINK = 1 << 2;
        /// Reverse video (swap fg/bg)
        const INVERSE = 1 << 3;
        /// Hidden/invisible text
        const INVISIBLE = 1 << 4;
        /// Dim/faint text
        const DIM = 1 << 5;
    }
}

const BG_MASK: u32 = 0x1ff;
const FG_SHIFT: u32 = 9;
const FLAGS_SHIFT: u32 = 18;

/// Packed cell styling: attribute flags plus foreground and background
/// color indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attr(u32);

impl Default for Attr {
    fn default() -> Self {
        Self::new(AttrFlags::empty(), DEFAULT_COLOR, DEFAULT_COLOR)
    }
}

impl Attr {
    pub fn new(flags: AttrFlags, fg: u16, bg: u16) -> Self {
        let fg = fg.min(DEFAULT_COLOR) as u32;
        let bg = bg.min(DEFAULT_COLOR) as u32;
        Self(((flags.bits() as u32) << FLAGS_SHIFT) | (fg << FG_SHIFT) | bg)
    }

    /// Raw packed value.
    pub fn packed(self) -> u32 {
        self.0
    }

    pub fn from_packed(raw: u32) -> Self {
        Self(raw)
    }

    pub fn flags(self) -> AttrFlags {
        AttrFlags::from_bits_truncate((self.0 >> FLAGS_SHIFT) as u16)
    }

    pub fn set_flags(&mut self, flags: AttrFlags) {
        self.0 = (self.0 & ((1 << FLAGS_SHIFT) - 1)) | ((flags.bits() as u32) << FLAGS_SHIFT);
    }

    pub fn insert_flags(&mut self, flags: AttrFlags) {
        let mut f = self.flags();
        f.insert(flags);
        self.set_flags(f);
    }

    pub fn remove_flags(&mut self, flags: AttrFlags) {
        let mut f = self.flags();
        f.remove(flags);
        self.set_flags(f);
    }

    pub fn contains(self, flags: AttrFlags) -> bool {
        self.flags().contains(flags)
    }

    /// Foreground palette index, or `None` for the terminal default.
    pub fn fg(self) -> Option<u8> {
        let raw = (self.0 >> FG_SHIFT) & BG_MASK;
        if raw == DEFAULT_COLOR as u32 {
            None
        } else {
            Some(raw as u8)
        }
    }

    /// Background palette index, or `None` for the terminal default.
    pub fn bg(self) -> Option<u8> {
        let raw = self.0 & BG_MASK;
        if raw == DEFAULT_COLOR as u32 {
            None
        } else {
            Some(raw as u8)
        }
    }

    pub fn set_fg(&mut self, fg: Option<u8>) {
        let raw = fg.map(|i| i as u32).unwrap_or(DEFAULT_COLOR as u32);
        self.0 = (self.0 & !(BG_MASK << FG_SHIFT)) | (raw << FG_SHIFT);
    }

    pub fn set_bg(&mut self, bg: Option<u8>) {
        let raw = bg.map(|i| i as u32).unwrap_or(DEFAULT_COLOR as u32);
        self.0 = (self.0 & !BG_MASK) | raw;
    }

    /// Attribute used when erasing cells: the current background color
    /// with default foreground and no flags.
    pub fn erase(self) -> Attr {
        Attr::new(AttrFlags::empty(), DEFAULT_COLOR, (self.0 & BG_MASK) as u16)
    }

    /// True for the all-default attribute.
    pub fn is_default(self) -> bool {
        self == Attr::default()
    }
}

/// A single terminal cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character in this cell
    pub ch: char,
    /// Columns occupied: 1 for ordinary cells, 2 for a wide lead cell,
    /// 0 for the spacer that pads a wide cell's second column
    pub width: u8,
    /// Packed styling
    pub attr: Attr,
    /// Combining characters attached to `ch`, if any
    pub combining: Option<Box<str>>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Attr::default())
    }
}

impl Cell {
    pub fn new(ch: char, width: u8, attr: Attr) -> Self {
        Self {
            ch,
            width,
            attr,
            combining: None,
        }
    }

    /// A blank (space) cell with the given attribute.
    pub fn blank(attr: Attr) -> Self {
        Self::new(' ', 1, attr)
    }

    /// The zero-width placeholder stored after a wide lead cell.
    pub fn wide_spacer(attr: Attr) -> Self {
        Self::new(' ', 0, attr)
    }

    /// Check if this cell is a wide character
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Check if this cell is the spacer half of a wide character
    pub fn is_spacer(&self) -> bool {
        self.width == 0
    }

    /// Attach a combining character to this cell.
    pub fn push_combining(&mut self, c: char) {
        match &mut self.combining {
            Some(s) => {
                let mut owned = String::from(std::mem::take(s));
                owned.push(c);
                *s = owned.into_boxed_str();
            }
            None => {
                self.combining = Some(String::from(c).into_boxed_str());
            }
        }
    }

    /// Full text content: base character plus combining characters.
    pub fn text(&self) -> String {
        let mut out = String::from(self.ch);
        if let Some(comb) = &self.combining {
            out.push_str(comb);
        }
        out
    }

    /// Append this cell's text to a string, skipping spacers.
    pub fn append_text(&self, out: &mut String) {
        if self.is_spacer() {
            return;
        }
        // NBSP renders as a blank but should copy out as a plain space.
        out.push(if self.ch == '\u{a0}' { ' ' } else { self.ch });
        if let Some(comb) = &self.combining {
            out.push_str(comb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_default() {
        let attr = Attr::default();
        assert_eq!(attr.fg(), None);
        assert_eq!(attr.bg(), None);
        assert!(attr.flags().is_empty());
        assert!(attr.is_default());
    }

    #[test]
    fn test_attr_packing() {
        let attr = Attr::new(AttrFlags::BOLD | AttrFlags::INVERSE, 1, 4);
        assert_eq!(attr.fg(), Some(1));
        assert_eq!(attr.bg(), Some(4));
        assert!(attr.contains(AttrFlags::BOLD));
        assert!(attr.contains(AttrFlags::INVERSE));
        assert!(!attr.contains(AttrFlags::UNDERLINE));

        let round = Attr::from_packed(attr.packed());
        assert_eq!(round, attr);
    }

    #[test]
    fn test_attr_field_updates() {
        let mut attr = Attr::default();
        attr.set_fg(Some(196));
        attr.insert_flags(AttrFlags::UNDERLINE);
        assert_eq!(attr.fg(), Some(196));
        assert_eq!(attr.bg(), None);
        assert!(attr.contains(AttrFlags::UNDERLINE));

        attr.remove_flags(AttrFlags::UNDERLINE);
        attr.set_fg(None);
        assert!(attr.is_default());
    }

    #[test]
    fn test_erase_attr_keeps_bg_only() {
        let mut attr = Attr::new(AttrFlags::BOLD, 1, DEFAULT_COLOR);
        attr.set_bg(Some(4));
        let erase = attr.erase();
        assert_eq!(erase.bg(), Some(4));
        assert_eq!(erase.fg(), None);
        assert!(erase.flags().is_empty());
    }

    #[test]
    fn test_cell_combining() {
        let mut cell = Cell::new('e', 1, Attr::default());
        cell.push_combining('\u{0301}');
        cell.push_combining('\u{0308}');
        assert_eq!(cell.text(), "e\u{0301}\u{0308}");
    }

    #[test]
    fn test_wide_pair() {
        let lead = Cell::new('日', 2, Attr::default());
        let spacer = Cell::wide_spacer(Attr::default());
        assert!(lead.is_wide());
        assert!(spacer.is_spacer());

        let mut out = String::new();
        lead.append_text(&mut out);
        spacer.append_text(&mut out);
        assert_eq!(out, "日");
    }
}
