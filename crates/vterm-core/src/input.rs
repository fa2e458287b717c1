//! Input encoding
//!
//! Turns host-side key, paste, focus and mouse input into the byte
//! sequences an application expects, honoring the terminal modes
//! (application cursor keys, LNM, bracketed paste, mouse tracking).

use crate::screen::{Modes, MouseMode};
use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const ALT = 2;
        const CTRL = 4;
        const SUPER = 8;
    }
}

/// A key press to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Function key, 1-based
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press,
    Release,
    Motion,
}

/// xterm modifier parameter: 1 plus modifier bits.
fn modifier_param(mods: Modifiers) -> u16 {
    let mut param = 1;
    if mods.contains(Modifiers::SHIFT) {
        param += 1;
    }
    if mods.contains(Modifiers::ALT) {
        param += 2;
    }
    if mods.contains(Modifiers::CTRL) {
        param += 4;
    }
    param
}

fn cursor_key(letter: char, mods: Modifiers, application: bool) -> Vec<u8> {
    if mods.intersects(Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL) {
        format!("\x1b[1;{}{}", modifier_param(mods), letter).into_bytes()
    } else if application {
        format!("\x1bO{}", letter).into_bytes()
    } else {
        format!("\x1b[{}", letter).into_bytes()
    }
}

fn tilde_key(code: u16, mods: Modifiers) -> Vec<u8> {
    if mods.intersects(Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL) {
        format!("\x1b[{};{}~", code, modifier_param(mods)).into_bytes()
    } else {
        format!("\x1b[{}~", code).into_bytes()
    }
}

fn ctrl_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' => Some(c as u8 - b'a' + 1),
        'A'..='Z' => Some(c as u8 - b'A' + 1),
        ' ' | '@' => Some(0),
        '[' => Some(27),
        '\\' => Some(28),
        ']' => Some(29),
        '^' => Some(30),
        '_' => Some(31),
        '?' => Some(127),
        _ => None,
    }
}

/// Encode a key press, or `None` when the combination has no byte
/// sequence.
pub fn encode_key(key: Key, mods: Modifiers, modes: &Modes) -> Option<Vec<u8>> {
    let alt = mods.contains(Modifiers::ALT);
    let with_alt = |mut bytes: Vec<u8>| {
        if alt {
            bytes.insert(0, 0x1b);
        }
        bytes
    };
    match key {
        Key::Char(c) => {
            let bytes = if mods.contains(Modifiers::CTRL) {
                match ctrl_byte(c) {
                    Some(byte) => vec![byte],
                    None => c.to_string().into_bytes(),
                }
            } else {
                c.to_string().into_bytes()
            };
            Some(with_alt(bytes))
        }
        Key::Enter => {
            let bytes = if modes.linefeed {
                b"\r\n".to_vec()
            } else {
                b"\r".to_vec()
            };
            Some(with_alt(bytes))
        }
        Key::Tab => {
            if mods.contains(Modifiers::SHIFT) {
                Some(b"\x1b[Z".to_vec())
            } else {
                Some(with_alt(b"\t".to_vec()))
            }
        }
        Key::Backspace => {
            let byte = if mods.contains(Modifiers::CTRL) {
                0x08
            } else {
                0x7f
            };
            Some(with_alt(vec![byte]))
        }
        Key::Escape => Some(with_alt(vec![0x1b])),
        Key::Up => Some(cursor_key('A', mods, modes.application_cursor)),
        Key::Down => Some(cursor_key('B', mods, modes.application_cursor)),
        Key::Right => Some(cursor_key('C', mods, modes.application_cursor)),
        Key::Left => Some(cursor_key('D', mods, modes.application_cursor)),
        Key::Home => Some(cursor_key('H', mods, modes.application_cursor)),
        Key::End => Some(cursor_key('F', mods, modes.application_cursor)),
        Key::PageUp => Some(tilde_key(5, mods)),
        Key::PageDown => Some(tilde_key(6, mods)),
        Key::Insert => Some(tilde_key(2, mods)),
        Key::Delete => Some(tilde_key(3, mods)),
        Key::F(n @ 1..=4) => {
            let letter = (b'P' + n - 1) as char;
            if mods.intersects(Modifiers::SHIFT | Modifiers::ALT | Modifiers::CTRL) {
                Some(format!("\x1b[1;{}{}", modifier_param(mods), letter).into_bytes())
            } else {
                Some(format!("\x1bO{}", letter).into_bytes())
            }
        }
        Key::F(n @ 5..=12) => {
            const CODES: [u16; 8] = [15, 17, 18, 19, 20, 21, 23, 24];
            Some(tilde_key(CODES[n as usize - 5], mods))
        }
        Key::F(_) => None,
    }
}

/// Encode pasted text: newlines become carriage returns, and bracketed
/// paste mode wraps the payload. The closing bracket sequence is
/// stripped from the payload so pasted text cannot terminate the
/// bracket early.
pub fn encode_paste(data: &str, modes: &Modes) -> Vec<u8> {
    let normalized = data.replace("\r\n", "\r").replace('\n', "\r");
    if modes.bracketed_paste {
        let safe = normalized.replace("\x1b[201~", "");
        let mut out = b"\x1b[200~".to_vec();
        out.extend_from_slice(safe.as_bytes());
        out.extend_from_slice(b"\x1b[201~");
        out
    } else {
        normalized.into_bytes()
    }
}

/// Encode a focus change, or `None` when reporting is off.
pub fn encode_focus(focused: bool, modes: &Modes) -> Option<Vec<u8>> {
    if !modes.focus_events {
        return None;
    }
    Some(if focused {
        b"\x1b[I".to_vec()
    } else {
        b"\x1b[O".to_vec()
    })
}

/// Encode a mouse event per the active tracking mode, or `None` when
/// the event is not reported. Coordinates are 0-based viewport cells.
pub fn encode_mouse(
    button: MouseButton,
    kind: MouseEventKind,
    col: usize,
    row: usize,
    mods: Modifiers,
    modes: &Modes,
) -> Option<Vec<u8>> {
    match modes.mouse {
        MouseMode::None => return None,
        MouseMode::X10 => {
            if kind != MouseEventKind::Press {
                return None;
            }
        }
        MouseMode::Normal => {
            if kind == MouseEventKind::Motion {
                return None;
            }
        }
        MouseMode::ButtonEvent | MouseMode::AnyEvent => {}
    }

    let mut cb: u8 = match (kind, button) {
        (MouseEventKind::Release, _) => 3,
        (_, MouseButton::Left) => 0,
        (_, MouseButton::Middle) => 1,
        (_, MouseButton::Right) => 2,
        (_, MouseButton::WheelUp) => 64,
        (_, MouseButton::WheelDown) => 65,
    };
    if kind == MouseEventKind::Motion {
        cb += 32;
    }
    // X10 reports carry no modifiers
    if modes.mouse != MouseMode::X10 {
        if mods.contains(Modifiers::SHIFT) {
            cb += 4;
        }
        if mods.contains(Modifiers::ALT) {
            cb += 8;
        }
        if mods.contains(Modifiers::CTRL) {
            cb += 16;
        }
    }

    // the classic encoding offsets everything by 32 and tops out at 255
    let cx = (col + 1).min(222) as u8 + 32;
    let cy = (row + 1).min(222) as u8 + 32;
    Some(vec![0x1b, b'[', b'M', 32 + cb, cx, cy])
}
