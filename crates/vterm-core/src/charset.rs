//! Character set designation (SCS)
//!
//! `ESC ( <d>` through `ESC + <d>` designate a character set into slots
//! G0-G3; SO/SI switch the active slot. Only the sets that matter in
//! practice are translated: DEC Special Graphics (line drawing) and the
//! UK set. Everything else passes characters through unchanged.

/// A designated character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// US ASCII, no translation
    #[default]
    Ascii,
    /// DEC Special Graphics and line drawing
    DecSpecial,
    /// United Kingdom: `#` maps to the pound sign
    Uk,
}

impl Charset {
    /// Character set for a designator byte, `None` for designators that
    /// name no translated set (those fall back to ASCII).
    pub fn from_designator(d: char) -> Option<Self> {
        match d {
            '0' => Some(Self::DecSpecial),
            'A' => Some(Self::Uk),
            'B' => Some(Self::Ascii),
            _ => None,
        }
    }

    /// Translate a character through this set.
    pub fn map(self, c: char) -> char {
        match self {
            Self::Ascii => c,
            Self::Uk => {
                if c == '#' {
                    '£'
                } else {
                    c
                }
            }
            Self::DecSpecial => dec_special(c),
        }
    }
}

/// DEC Special Graphics mapping for the printable ASCII range.
fn dec_special(c: char) -> char {
    match c {
        '`' => '\u{25c6}',  // diamond
        'a' => '\u{2592}',  // checkerboard
        'b' => '\u{2409}',  // HT symbol
        'c' => '\u{240c}',  // FF symbol
        'd' => '\u{240d}',  // CR symbol
        'e' => '\u{240a}',  // LF symbol
        'f' => '\u{00b0}',  // degree
        'g' => '\u{00b1}',  // plus-minus
        'h' => '\u{2424}',  // NL symbol
        'i' => '\u{240b}',  // VT symbol
        'j' => '\u{2518}',  // corner ┘
        'k' => '\u{2510}',  // corner ┐
        'l' => '\u{250c}',  // corner ┌
        'm' => '\u{2514}',  // corner └
        'n' => '\u{253c}',  // crossing ┼
        'o' => '\u{23ba}',  // scan line 1
        'p' => '\u{23bb}',  // scan line 3
        'q' => '\u{2500}',  // horizontal ─
        'r' => '\u{23bc}',  // scan line 7
        's' => '\u{23bd}',  // scan line 9
        't' => '\u{251c}',  // tee ├
        'u' => '\u{2524}',  // tee ┤
        'v' => '\u{2534}',  // tee ┴
        'w' => '\u{252c}',  // tee ┬
        'x' => '\u{2502}',  // vertical │
        'y' => '\u{2264}',  // less than or equal
        'z' => '\u{2265}',  // greater than or equal
        '{' => '\u{03c0}',  // pi
        '|' => '\u{2260}',  // not equal
        '}' => '\u{00a3}',  // pound
        '~' => '\u{00b7}',  // centered dot
        '_' => ' ',
        other => other,
    }
}
