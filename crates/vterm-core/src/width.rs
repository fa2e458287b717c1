//! Display width classification for characters
//!
//! Every character written to the screen occupies 0, 1 or 2 columns:
//! - 0: combining marks and other zero-width characters (merged into the
//!   preceding cell)
//! - 1: ordinary narrow characters
//! - 2: East Asian wide and fullwidth characters (stored as a lead cell
//!   followed by a spacer cell)

use unicode_width::UnicodeWidthChar;

/// Number of screen columns the character occupies.
///
/// Control characters and characters with no defined width report zero.
pub fn char_width(c: char) -> u8 {
    if c.is_control() {
        return 0;
    }
    match c.width() {
        Some(w) => w.min(2) as u8,
        None => 0,
    }
}
