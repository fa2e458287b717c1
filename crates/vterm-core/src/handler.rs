//! Escape sequence handler
//!
//! Implements [`Perform`] over a [`Screen`], mapping parsed control
//! functions onto screen operations. Replies (device attributes, status
//! reports, DECRQSS) are emitted as [`Event::Send`] for the host to
//! forward to the application.

use crate::cell::{Attr, AttrFlags};
use crate::charset::Charset;
use crate::color::{PaletteMatcher, Rgb};
use crate::event::{ClipboardOperation, ClipboardSelection, Event};
use crate::parser::Perform;
use crate::screen::{ClearLineMode, ClearMode, CursorStyle, MouseMode, Screen};
use base64::Engine;

pub(crate) struct Handler<'a> {
    screen: &'a mut Screen,
    colors: &'a mut PaletteMatcher,
}

impl<'a> Handler<'a> {
    pub(crate) fn new(screen: &'a mut Screen, colors: &'a mut PaletteMatcher) -> Self {
        Self { screen, colors }
    }

    fn send(&mut self, bytes: Vec<u8>) {
        self.screen.emit(Event::Send(bytes));
    }

    fn handle_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.screen.attr = Attr::default();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => self.screen.attr = Attr::default(),
                1 => self.screen.attr.insert_flags(AttrFlags::BOLD),
                2 => self.screen.attr.insert_flags(AttrFlags::DIM),
                4 => self.screen.attr.insert_flags(AttrFlags::UNDERLINE),
                5 => self.screen.attr.insert_flags(AttrFlags::BLINK),
                7 => self.screen.attr.insert_flags(AttrFlags::INVERSE),
                8 => self.screen.attr.insert_flags(AttrFlags::INVISIBLE),
                21 | 22 => self
                    .screen
                    .attr
                    .remove_flags(AttrFlags::BOLD | AttrFlags::DIM),
                24 => self.screen.attr.remove_flags(AttrFlags::UNDERLINE),
                25 => self.screen.attr.remove_flags(AttrFlags::BLINK),
                27 => self.screen.attr.remove_flags(AttrFlags::INVERSE),
                28 => self.screen.attr.remove_flags(AttrFlags::INVISIBLE),
                30..=37 => self.screen.attr.set_fg(Some((params[i] - 30) as u8)),
                39 => self.screen.attr.set_fg(None),
                40..=47 => self.screen.attr.set_bg(Some((params[i] - 40) as u8)),
                49 => self.screen.attr.set_bg(None),
                90..=97 => self.screen.attr.set_fg(Some((params[i] - 90 + 8) as u8)),
                100..=107 => self.screen.attr.set_bg(Some((params[i] - 100 + 8) as u8)),
                38 | 48 => {
                    let is_fg = params[i] == 38;
                    match params.get(i + 1).copied() {
                        Some(5) => {
                            let idx = params.get(i + 2).copied().unwrap_or(0).min(255) as u8;
                            if is_fg {
                                self.screen.attr.set_fg(Some(idx));
                            } else {
                                self.screen.attr.set_bg(Some(idx));
                            }
                            i += 2;
                        }
                        Some(2) => {
                            let channel = |offset: usize| {
                                params.get(i + offset).copied().unwrap_or(0).min(255) as u8
                            };
                            let rgb = Rgb {
                                r: channel(2),
                                g: channel(3),
                                b: channel(4),
                            };
                            let idx = self.colors.nearest(rgb);
                            if is_fg {
                                self.screen.attr.set_fg(Some(idx));
                            } else {
                                self.screen.attr.set_bg(Some(idx));
                            }
                            i += 4;
                        }
                        other => {
                            log::debug!("Ignoring SGR {} with color space {:?}", params[i], other);
                            return;
                        }
                    }
                }
                p => log::trace!("Ignoring SGR {}", p),
            }
            i += 1;
        }
    }

    fn dec_mode(&mut self, param: u16, enable: bool) {
        match param {
            // DECCKM
            1 => self.screen.modes.application_cursor = enable,
            // DECOM
            6 => {
                self.screen.modes.origin = enable;
                self.screen.set_cursor(0, 0);
            }
            // DECAWM
            7 => self.screen.modes.wraparound = enable,
            // X10 mouse
            9 => {
                self.screen.modes.mouse = if enable { MouseMode::X10 } else { MouseMode::None }
            }
            // cursor blink
            12 => self.screen.cursor.blink = enable,
            // DECTCEM
            25 => {
                self.screen.cursor.visible = enable;
                let y = self.screen.cursor.y;
                self.screen.mark_dirty(y);
            }
            47 => {
                if enable {
                    self.screen.enter_alternate();
                } else {
                    self.screen.exit_alternate();
                }
            }
            // DECNKM
            66 => self.screen.modes.application_keypad = enable,
            1000 => {
                self.screen.modes.mouse = if enable {
                    MouseMode::Normal
                } else {
                    MouseMode::None
                }
            }
            1002 => {
                self.screen.modes.mouse = if enable {
                    MouseMode::ButtonEvent
                } else {
                    MouseMode::None
                }
            }
            1003 => {
                self.screen.modes.mouse = if enable {
                    MouseMode::AnyEvent
                } else {
                    MouseMode::None
                }
            }
            // focus reporting
            1004 => self.screen.modes.focus_events = enable,
            1047 => {
                if enable {
                    self.screen.enter_alternate();
                } else {
                    self.screen.exit_alternate();
                }
            }
            1048 => {
                if enable {
                    self.screen.save_cursor();
                } else {
                    self.screen.restore_cursor();
                }
            }
            1049 => {
                if enable {
                    self.screen.save_cursor();
                    self.screen.enter_alternate();
                } else {
                    self.screen.exit_alternate();
                    self.screen.restore_cursor();
                }
            }
            // bracketed paste
            2004 => self.screen.modes.bracketed_paste = enable,
            _ => log::debug!("Ignoring DEC private mode {}", param),
        }
    }

    fn ansi_mode(&mut self, param: u16, enable: bool) {
        match param {
            // IRM
            4 => self.screen.modes.insert = enable,
            // LNM
            20 => self.screen.modes.linefeed = enable,
            _ => log::debug!("Ignoring ANSI mode {}", param),
        }
    }

    /// DECRQSS reply for the current SGR state.
    fn sgr_report(&self) -> String {
        let attr = self.screen.attr;
        let mut out = String::from("0");
        let flags = attr.flags();
        for (flag, code) in [
            (AttrFlags::BOLD, 1),
            (AttrFlags::DIM, 2),
            (AttrFlags::UNDERLINE, 4),
            (AttrFlags::BLINK, 5),
            (AttrFlags::INVERSE, 7),
            (AttrFlags::INVISIBLE, 8),
        ] {
            if flags.contains(flag) {
                out.push_str(&format!(";{}", code));
            }
        }
        if let Some(fg) = attr.fg() {
            match fg {
                0..=7 => out.push_str(&format!(";{}", 30 + fg as u16)),
                8..=15 => out.push_str(&format!(";{}", 90 + fg as u16 - 8)),
                _ => out.push_str(&format!(";38;5;{}", fg)),
            }
        }
        if let Some(bg) = attr.bg() {
            match bg {
                0..=7 => out.push_str(&format!(";{}", 40 + bg as u16)),
                8..=15 => out.push_str(&format!(";{}", 100 + bg as u16 - 8)),
                _ => out.push_str(&format!(";48;5;{}", bg)),
            }
        }
        out
    }
}

impl Perform for Handler<'_> {
    fn print(&mut self, c: char) {
        let c = self.screen.translate(c);
        self.screen.put_char(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => self.screen.emit(Event::Bell),
            0x08 => self.screen.backspace(),
            0x09 => self.screen.tab_forward(1),
            0x0a | 0x0b | 0x0c => {
                self.screen.linefeed();
                if self.screen.modes.linefeed {
                    self.screen.carriage_return();
                }
            }
            0x0d => self.screen.carriage_return(),
            // SO / SI
            0x0e => self.screen.set_glevel(1),
            0x0f => self.screen.set_glevel(0),
            // C1: IND, NEL, HTS, RI
            0x84 => self.screen.index(),
            0x85 => {
                self.screen.index();
                self.screen.carriage_return();
            }
            0x88 => self.screen.set_tab_stop(),
            0x8d => self.screen.reverse_index(),
            _ => log::trace!("Ignoring control byte {:#04x}", byte),
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &[u16],
        prefix: Option<char>,
        postfix: Option<char>,
        action: char,
    ) {
        let p0 = params.first().copied().unwrap_or(0);
        let n = p0.max(1) as usize;
        match (action, prefix) {
            // Insert Characters (ICH)
            ('@', None) => self.screen.insert_chars(n),
            // Cursor Up (CUU)
            ('A', None) => self.screen.move_cursor(-(n as isize), 0),
            // Cursor Down (CUD)
            ('B', None) => self.screen.move_cursor(n as isize, 0),
            // Cursor Forward (CUF)
            ('C', None) => self.screen.move_cursor(0, n as isize),
            // Cursor Backward (CUB)
            ('D', None) => self.screen.move_cursor(0, -(n as isize)),
            // Cursor Next Line (CNL)
            ('E', None) => {
                self.screen.move_cursor(n as isize, 0);
                self.screen.carriage_return();
            }
            // Cursor Preceding Line (CPL)
            ('F', None) => {
                self.screen.move_cursor(-(n as isize), 0);
                self.screen.carriage_return();
            }
            // Cursor Character Absolute (CHA)
            ('G', None) => self.screen.set_cursor_col(n - 1),
            // Cursor Position (CUP) / Horizontal and Vertical Position (HVP)
            ('H', None) | ('f', None) => {
                let col = params.get(1).copied().unwrap_or(0).max(1) as usize - 1;
                self.screen.set_cursor(col, n - 1);
            }
            // Cursor Forward Tabulation (CHT)
            ('I', None) => self.screen.tab_forward(n),
            // Erase in Display (ED / DECSED)
            ('J', _) => match p0 {
                0 => self.screen.clear(ClearMode::Below),
                1 => self.screen.clear(ClearMode::Above),
                2 => self.screen.clear(ClearMode::All),
                3 => self.screen.clear(ClearMode::Scrollback),
                _ => log::debug!("Ignoring ED {}", p0),
            },
            // Erase in Line (EL / DECSEL)
            ('K', _) => match p0 {
                0 => self.screen.clear_line(ClearLineMode::Right),
                1 => self.screen.clear_line(ClearLineMode::Left),
                2 => self.screen.clear_line(ClearLineMode::All),
                _ => log::debug!("Ignoring EL {}", p0),
            },
            // Insert Lines (IL)
            ('L', None) => self.screen.insert_lines(n),
            // Delete Lines (DL)
            ('M', None) => self.screen.delete_lines(n),
            // Delete Characters (DCH)
            ('P', None) => self.screen.delete_chars(n),
            // Scroll Up (SU)
            ('S', None) => self.screen.scroll_up(n),
            // Scroll Down (SD); the multi-parameter form is mouse
            // tracking configuration
            ('T', None) => {
                if params.len() <= 1 {
                    self.screen.scroll_down(n);
                }
            }
            // Erase Characters (ECH)
            ('X', None) => self.screen.erase_chars(n),
            // Cursor Backward Tabulation (CBT)
            ('Z', None) => self.screen.tab_backward(n),
            // Character Position Absolute (HPA)
            ('`', None) => self.screen.set_cursor_col(n - 1),
            // Character Position Relative (HPR)
            ('a', None) => self.screen.move_cursor(0, n as isize),
            // Repeat Preceding Character (REP)
            ('b', None) => self.screen.repeat_last(n),
            // Primary Device Attributes (DA1)
            ('c', None) => {
                if p0 == 0 {
                    self.send(b"\x1b[?1;2c".to_vec());
                }
            }
            // Secondary Device Attributes (DA2)
            ('c', Some('>')) => {
                if p0 == 0 {
                    self.send(b"\x1b[>0;276;0c".to_vec());
                }
            }
            // Line Position Absolute (VPA)
            ('d', None) => self.screen.set_cursor_row(n - 1),
            // Line Position Relative (VPR)
            ('e', None) => self.screen.move_cursor(n as isize, 0),
            // Tab Clear (TBC)
            ('g', None) => match p0 {
                0 => self.screen.clear_tab_stop(),
                3 => self.screen.clear_all_tab_stops(),
                _ => log::debug!("Ignoring TBC {}", p0),
            },
            // Set Mode (SM) / DEC Private Mode Set (DECSET)
            ('h', None) => {
                for &param in params {
                    self.ansi_mode(param, true);
                }
            }
            ('h', Some('?')) => {
                for &param in params {
                    self.dec_mode(param, true);
                }
            }
            // Reset Mode (RM) / DEC Private Mode Reset (DECRST)
            ('l', None) => {
                for &param in params {
                    self.ansi_mode(param, false);
                }
            }
            ('l', Some('?')) => {
                for &param in params {
                    self.dec_mode(param, false);
                }
            }
            // Select Graphic Rendition (SGR)
            ('m', None) => self.handle_sgr(params),
            // Device Status Report (DSR)
            ('n', None) => match p0 {
                5 => self.send(b"\x1b[0n".to_vec()),
                6 => {
                    let row = self.screen.cursor.y + 1;
                    let col = self.screen.cursor.x.min(self.screen.cols() - 1) + 1;
                    self.send(format!("\x1b[{};{}R", row, col).into_bytes());
                }
                _ => log::debug!("Ignoring DSR {}", p0),
            },
            ('n', Some('?')) => log::trace!("Ignoring DEC DSR {}", p0),
            // Soft Terminal Reset (DECSTR)
            ('p', Some('!')) => self.screen.soft_reset(),
            // Set Cursor Style (DECSCUSR)
            ('q', None) if postfix == Some(' ') => {
                let (style, blink) = match p0 {
                    0 | 1 => (CursorStyle::Block, true),
                    2 => (CursorStyle::Block, false),
                    3 => (CursorStyle::Underline, true),
                    4 => (CursorStyle::Underline, false),
                    5 => (CursorStyle::Bar, true),
                    6 => (CursorStyle::Bar, false),
                    _ => {
                        log::debug!("Ignoring cursor style {}", p0);
                        return;
                    }
                };
                self.screen.cursor.style = style;
                self.screen.cursor.blink = blink;
            }
            // Set Scroll Region (DECSTBM)
            ('r', None) => {
                let rows = self.screen.rows();
                let top = n - 1;
                let bottom = match params.get(1).copied().unwrap_or(0) {
                    0 => rows - 1,
                    b => (b as usize - 1).min(rows - 1),
                };
                self.screen.set_scroll_region(top, bottom);
            }
            // Save / Restore Cursor (ANSI.SYS style)
            ('s', None) => self.screen.save_cursor(),
            ('u', None) => self.screen.restore_cursor(),
            _ => log::debug!(
                "Ignoring CSI {:?} prefix {:?} postfix {:?} params {:?}",
                action,
                prefix,
                postfix,
                params
            ),
        }
    }

    fn esc_dispatch(&mut self, byte: u8) {
        match byte {
            // Index (IND)
            b'D' => self.screen.index(),
            // Next Line (NEL)
            b'E' => {
                self.screen.index();
                self.screen.carriage_return();
            }
            // Tab Set (HTS)
            b'H' => self.screen.set_tab_stop(),
            // Reverse Index (RI)
            b'M' => self.screen.reverse_index(),
            // Save / Restore Cursor (DECSC / DECRC)
            b'7' => self.screen.save_cursor(),
            b'8' => self.screen.restore_cursor(),
            // Keypad modes (DECKPAM / DECKPNM)
            b'=' => self.screen.modes.application_keypad = true,
            b'>' => self.screen.modes.application_keypad = false,
            // Full Reset (RIS)
            b'c' => self.screen.reset(),
            _ => log::debug!("Ignoring escape final {:?}", byte as char),
        }
    }

    fn osc_dispatch(&mut self, code: u16, data: &str) {
        match code {
            0 => {
                self.screen.set_title(data);
                self.screen.set_icon_name(data);
            }
            1 => self.screen.set_icon_name(data),
            2 => self.screen.set_title(data),
            52 => {
                let Some((target, payload)) = data.split_once(';') else {
                    log::debug!("Ignoring malformed OSC 52 {:?}", data);
                    return;
                };
                let selection = target
                    .chars()
                    .find_map(|c| match c {
                        'c' => Some(ClipboardSelection::Clipboard),
                        'p' => Some(ClipboardSelection::Primary),
                        's' => Some(ClipboardSelection::Select),
                        _ => None,
                    })
                    .unwrap_or(ClipboardSelection::Clipboard);
                if payload == "?" {
                    self.screen
                        .emit(Event::Clipboard(ClipboardOperation::Query { selection }));
                } else {
                    match base64::engine::general_purpose::STANDARD.decode(payload) {
                        Ok(data) => self
                            .screen
                            .emit(Event::Clipboard(ClipboardOperation::Set { selection, data })),
                        Err(err) => log::debug!("Ignoring undecodable OSC 52 payload: {}", err),
                    }
                }
            }
            _ => log::debug!("Ignoring OSC {} {:?}", code, data),
        }
    }

    fn dcs_dispatch(&mut self, data: &str) {
        // DECRQSS: report the requested setting
        if let Some(request) = data.strip_prefix("$q") {
            let reply = match request {
                "m" => Some(format!("{}m", self.sgr_report())),
                "r" => Some(format!(
                    "{};{}r",
                    self.screen.scroll_top() + 1,
                    self.screen.scroll_bottom() + 1
                )),
                _ => None,
            };
            match reply {
                Some(payload) => self.send(format!("\x1bP1$r{}\x1b\\", payload).into_bytes()),
                None => {
                    log::debug!("Ignoring DECRQSS request {:?}", request);
                    self.send(b"\x1bP0$r\x1b\\".to_vec());
                }
            }
        } else {
            log::debug!("Ignoring DCS {:?}", data);
        }
    }

    fn set_charset(&mut self, slot: usize, charset: Charset) {
        self.screen.designate_charset(slot, charset);
    }
}
