//! ANSI/VT escape sequence parser
//!
//! A byte-at-a-time state machine that turns a raw output stream into
//! parser actions on a [`Perform`] implementation. Input may arrive in
//! arbitrary chunks: escape sequences and multi-byte UTF-8 characters
//! split across chunk boundaries parse identically to unsplit input,
//! because all pending state (current sequence, partial code point)
//! lives in the parser between calls.

use crate::charset::Charset;

/// Upper bound on collected CSI parameters; extras are dropped.
const MAX_PARAMS: usize = 32;
/// Upper bound on OSC/DCS payload bytes; extras are dropped.
const MAX_STRING_LEN: usize = 65536;

/// Receiver for parser actions.
///
/// The parser recognizes sequence structure; what a sequence *does* is
/// up to the performer (see [`crate::handler`]).
pub trait Perform {
    /// A printable character, already decoded from UTF-8.
    fn print(&mut self, c: char);

    /// A C0/C1 control executed outside any sequence.
    fn execute(&mut self, byte: u8);

    /// A complete CSI sequence: `ESC [ <prefix?> <params> <postfix?> <action>`.
    fn csi_dispatch(&mut self, params: &[u16], prefix: Option<char>, postfix: Option<char>, action: char);

    /// A simple escape sequence: `ESC <byte>`.
    fn esc_dispatch(&mut self, byte: u8);

    /// A complete OSC sequence: `ESC ] <code> ; <data>` terminated by
    /// BEL or ST.
    fn osc_dispatch(&mut self, code: u16, data: &str);

    /// A complete DCS sequence payload, terminated by BEL or ST.
    fn dcs_dispatch(&mut self, data: &str);

    /// Charset designation: `ESC ( <d>` and friends for slots G0-G3.
    fn set_charset(&mut self, slot: usize, charset: Charset);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// Printables and controls flow straight through
    #[default]
    Normal,
    /// After ESC, selecting a sequence type
    Escaped,
    /// Collecting CSI parameters
    CsiParam,
    /// Dispatching the CSI final byte
    Csi,
    /// Collecting an OSC string
    Osc,
    /// Consuming one charset designator
    CharsetDesignate,
    /// Collecting a DCS string
    Dcs,
    /// Discarding an APC/PM string
    IgnoreString,
}

/// Outcome of feeding one byte to the UTF-8 decoder.
enum Utf8Result {
    /// Byte consumed, nothing to emit yet
    Pending,
    /// A complete character
    Char(char),
    /// Malformed input; emit U+FFFD
    Invalid,
    /// Malformed continuation; emit U+FFFD, then reprocess the byte
    InvalidReprocess(u8),
}

/// Incremental UTF-8 decoder. Partial code points buffer across calls.
#[derive(Debug, Default)]
struct Utf8Decoder {
    buf: [u8; 4],
    len: usize,
    need: usize,
}

impl Utf8Decoder {
    fn push(&mut self, byte: u8) -> Utf8Result {
        if self.need == 0 {
            return match byte {
                0x00..=0x7f => Utf8Result::Char(byte as char),
                0xc2..=0xdf => self.start(byte, 1),
                0xe0..=0xef => self.start(byte, 2),
                0xf0..=0xf4 => self.start(byte, 3),
                // orphan continuation byte: dropped without output
                0x80..=0xbf => Utf8Result::Pending,
                // 0xc0/0xc1 overlong leads and 0xf5+ out-of-range leads
                _ => Utf8Result::Invalid,
            };
        }
        if (0x80..=0xbf).contains(&byte) {
            self.buf[self.len] = byte;
            self.len += 1;
            self.need -= 1;
            if self.need > 0 {
                return Utf8Result::Pending;
            }
            let complete = &self.buf[..self.len];
            let result = match std::str::from_utf8(complete) {
                Ok(s) => match s.chars().next() {
                    Some(c) => Utf8Result::Char(c),
                    None => Utf8Result::Invalid,
                },
                // well-formed byte structure but invalid scalar
                // (surrogates, overlong encodings)
                Err(_) => Utf8Result::Invalid,
            };
            self.len = 0;
            result
        } else {
            // lead byte promised a continuation that never came
            self.len = 0;
            self.need = 0;
            Utf8Result::InvalidReprocess(byte)
        }
    }

    fn start(&mut self, byte: u8, need: usize) -> Utf8Result {
        self.buf[0] = byte;
        self.len = 1;
        self.need = need;
        Utf8Result::Pending
    }
}

/// The escape sequence state machine.
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    params: Vec<u16>,
    current_param: u16,
    prefix: Option<char>,
    postfix: Option<char>,
    osc_buf: String,
    dcs_buf: String,
    charset_slot: Option<usize>,
    utf8: Utf8Decoder,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes, dispatching actions to `performer`.
    pub fn process<P: Perform>(&mut self, performer: &mut P, bytes: &[u8]) {
        for &byte in bytes {
            self.advance(performer, byte);
        }
    }

    fn advance<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        let mut pending = Some(byte);
        while let Some(b) = pending.take() {
            match self.utf8.push(b) {
                Utf8Result::Pending => {}
                Utf8Result::Char(c) => self.step(performer, c),
                Utf8Result::Invalid => self.step(performer, char::REPLACEMENT_CHARACTER),
                Utf8Result::InvalidReprocess(next) => {
                    self.step(performer, char::REPLACEMENT_CHARACTER);
                    pending = Some(next);
                }
            }
        }
    }

    fn step<P: Perform>(&mut self, performer: &mut P, c: char) {
        loop {
            match self.state {
                State::Normal => {
                    match c {
                        '\x1b' => self.state = State::Escaped,
                        c if is_control(c) => performer.execute(c as u8),
                        c => performer.print(c),
                    }
                    return;
                }
                State::Escaped => {
                    self.step_escaped(performer, c);
                    return;
                }
                State::CsiParam => {
                    match c {
                        '0'..='9' => {
                            let d = c as u16 - '0' as u16;
                            self.current_param =
                                self.current_param.saturating_mul(10).saturating_add(d);
                        }
                        ';' => {
                            self.push_param();
                        }
                        '?' | '>' | '!' => self.prefix = Some(c),
                        ' ' | '"' | '$' | '\'' => self.postfix = Some(c),
                        _ => {
                            // final byte: bank the last param and
                            // reprocess in the dispatch state
                            self.push_param();
                            self.state = State::Csi;
                            continue;
                        }
                    }
                    return;
                }
                State::Csi => {
                    performer.csi_dispatch(&self.params, self.prefix, self.postfix, c);
                    self.clear_sequence();
                    self.state = State::Normal;
                    return;
                }
                State::Osc => {
                    match c {
                        '\x07' => {
                            self.dispatch_osc(performer);
                            self.state = State::Normal;
                        }
                        '\x1b' => {
                            // ESC here is almost always the first half
                            // of ST; the terminator is swallowed by the
                            // Escaped state
                            self.dispatch_osc(performer);
                            self.state = State::Escaped;
                        }
                        c => {
                            if self.osc_buf.len() < MAX_STRING_LEN {
                                self.osc_buf.push(c);
                            }
                        }
                    }
                    return;
                }
                State::CharsetDesignate => {
                    if let Some(slot) = self.charset_slot.take() {
                        // unknown designators fall back to ASCII
                        let charset = Charset::from_designator(c).unwrap_or_default();
                        performer.set_charset(slot, charset);
                    }
                    self.state = State::Normal;
                    return;
                }
                State::Dcs => {
                    match c {
                        '\x07' => {
                            performer.dcs_dispatch(&self.dcs_buf);
                            self.dcs_buf.clear();
                            self.state = State::Normal;
                        }
                        '\x1b' => {
                            performer.dcs_dispatch(&self.dcs_buf);
                            self.dcs_buf.clear();
                            self.state = State::Escaped;
                        }
                        c => {
                            if self.dcs_buf.len() < MAX_STRING_LEN {
                                self.dcs_buf.push(c);
                            }
                        }
                    }
                    return;
                }
                State::IgnoreString => {
                    match c {
                        '\x07' => self.state = State::Normal,
                        '\x1b' => self.state = State::Escaped,
                        _ => {}
                    }
                    return;
                }
            }
        }
    }

    fn step_escaped<P: Perform>(&mut self, performer: &mut P, c: char) {
        match c {
            '[' => {
                self.clear_sequence();
                self.state = State::CsiParam;
            }
            ']' => {
                self.osc_buf.clear();
                self.state = State::Osc;
            }
            'P' => {
                self.dcs_buf.clear();
                self.state = State::Dcs;
            }
            // APC and PM strings are consumed and discarded
            '_' | '^' => self.state = State::IgnoreString,
            '(' => self.designate(0),
            ')' => self.designate(1),
            '*' => self.designate(2),
            '+' => self.designate(3),
            // VT300 designators for G1/G2
            '-' => self.designate(1),
            '.' => self.designate(2),
            '%' => {
                // ESC % G / ESC % @ select UTF-8/default; either way G0
                // returns to ASCII and the selector char is consumed
                performer.set_charset(0, Charset::Ascii);
                self.charset_slot = None;
                self.state = State::CharsetDesignate;
            }
            '#' => {
                // DEC line attribute sequences (ESC # digit): consume
                // the digit, no screen support
                self.charset_slot = None;
                self.state = State::CharsetDesignate;
            }
            // string terminator for a just-finished OSC/DCS/APC
            '\\' => self.state = State::Normal,
            c => {
                performer.esc_dispatch(c as u8);
                self.state = State::Normal;
            }
        }
    }

    fn designate(&mut self, slot: usize) {
        self.charset_slot = Some(slot);
        self.state = State::CharsetDesignate;
    }

    fn push_param(&mut self) {
        if self.params.len() < MAX_PARAMS {
            self.params.push(self.current_param);
        }
        self.current_param = 0;
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.current_param = 0;
        self.prefix = None;
        self.postfix = None;
    }

    fn dispatch_osc<P: Perform>(&mut self, performer: &mut P) {
        let (code, data) = match self.osc_buf.split_once(';') {
            Some((code, data)) => (code, data),
            None => (self.osc_buf.as_str(), ""),
        };
        match code.parse::<u16>() {
            Ok(code) => performer.osc_dispatch(code, data),
            Err(_) => log::debug!("Malformed OSC selector: {:?}", code),
        }
        self.osc_buf.clear();
    }
}

fn is_control(c: char) -> bool {
    matches!(c, '\0'..='\x1f' | '\x7f' | '\u{80}'..='\u{9f}')
}
