//! Screen state and operations
//!
//! The screen owns the row buffer (scrollback plus viewport), cursor,
//! scroll region, tab stops, modes and current attribute, and provides
//! the operations the command handler drives: printing, scrolling,
//! erasing, line/character edits, the alternate screen, resize and
//! search.
//!
//! Row indices come in two flavors. "Absolute" rows index the whole
//! buffer (0 = oldest scrollback row). Viewport-relative rows are
//! offsets from `ybase`, which is where the active screen starts;
//! `ydisp` is the row the display is scrolled to and trails `ybase`
//! when the user has scrolled up.

use crate::buffer::{CircularBuffer, Marker, Row};
use crate::cell::{Attr, Cell};
use crate::charset::Charset;
use crate::event::Event;
use crate::width::char_width;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on ring capacity (rows of scrollback plus viewport).
const MAX_CAPACITY: usize = (u32::MAX / 64) as usize;

/// Screen behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Lines of scrollback kept above the viewport
    pub scrollback: usize,
    /// Distance between default tab stops
    pub tab_width: usize,
    /// Treat LF as CR LF
    pub convert_eol: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            scrollback: 1000,
            tab_width: 8,
            convert_eol: false,
        }
    }
}

/// Cursor position and presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Column, 0-based. May equal the column count transiently after
    /// printing in the last column.
    pub x: usize,
    /// Viewport row, 0-based
    pub y: usize,
    /// DECTCEM visibility
    pub visible: bool,
    pub style: CursorStyle,
    pub blink: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            visible: true,
            style: CursorStyle::Block,
            blink: true,
        }
    }
}

/// Cursor shape (DECSCUSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorStyle {
    #[default]
    Block,
    Underline,
    Bar,
}

/// Mouse tracking protocol requested by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    #[default]
    None,
    /// Press only (mode 9)
    X10,
    /// Press and release (mode 1000)
    Normal,
    /// Press, release and drag (mode 1002)
    ButtonEvent,
    /// All motion (mode 1003)
    AnyEvent,
}

/// Terminal mode flags (DEC private and ANSI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// DECCKM: cursor keys send SS3 sequences
    pub application_cursor: bool,
    /// DECNKM / ESC =: keypad sends application sequences
    pub application_keypad: bool,
    /// DECOM: cursor addressing relative to the scroll region
    pub origin: bool,
    /// DECAWM: wrap at the right margin
    pub wraparound: bool,
    /// IRM: insert instead of overwrite
    pub insert: bool,
    /// LNM: LF implies CR
    pub linefeed: bool,
    /// Mode 2004: wrap pastes in bracketing sequences
    pub bracketed_paste: bool,
    /// Mode 1004: report focus in/out
    pub focus_events: bool,
    pub mouse: MouseMode,
    /// True while the alternate screen is active
    pub alternate_screen: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            application_cursor: false,
            application_keypad: false,
            origin: false,
            wraparound: true,
            insert: false,
            linefeed: false,
            bracketed_paste: false,
            focus_events: false,
            mouse: MouseMode::None,
            alternate_screen: false,
        }
    }
}

/// Erase-in-display variants (ED).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Cursor to end of screen
    Below,
    /// Start of screen to cursor
    Above,
    /// Whole viewport
    All,
    /// Scrollback only
    Scrollback,
}

/// Erase-in-line variants (EL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearLineMode {
    /// Cursor to end of line
    Right,
    /// Start of line to cursor
    Left,
    /// Whole line
    All,
}

/// State saved by DECSC and restored by DECRC.
#[derive(Debug, Clone)]
struct SavedCursor {
    x: usize,
    y: usize,
    attr: Attr,
    charsets: [Charset; 4],
    glevel: usize,
}

/// The primary screen stashed away while the alternate screen is active.
#[derive(Debug)]
struct NormalState {
    lines: CircularBuffer<Row>,
    ybase: usize,
    ydisp: usize,
    scroll_top: usize,
    scroll_bottom: usize,
    tabs: Vec<bool>,
    cursor: Cursor,
}

/// A search hit in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Absolute row
    pub row: usize,
    /// Starting display column
    pub col: usize,
    /// Length in display columns
    pub len: usize,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// The terminal screen: scrollback, viewport, cursor and modes.
#[derive(Debug)]
pub struct Screen {
    cols: usize,
    rows: usize,
    config: ScreenConfig,
    lines: CircularBuffer<Row>,
    normal: Option<Box<NormalState>>,
    ybase: usize,
    ydisp: usize,
    pub cursor: Cursor,
    saved_cursor: Option<SavedCursor>,
    /// Scroll region, viewport-relative, both ends inclusive
    scroll_top: usize,
    scroll_bottom: usize,
    tabs: Vec<bool>,
    /// Attribute applied to newly printed cells
    pub attr: Attr,
    charsets: [Charset; 4],
    glevel: usize,
    pub modes: Modes,
    title: String,
    icon_name: String,
    events: Vec<Event>,
    /// Viewport rows needing redraw since the last take_dirty
    dirty: Option<(usize, usize)>,
    /// Scrollback rows trimmed since the last take_trimmed
    trimmed: usize,
    /// Position and character of the last printed glyph, for REP
    last_print: Option<(usize, usize, char)>,
}

impl Screen {
    pub fn new(cols: usize, rows: usize, config: ScreenConfig) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let capacity = rows.saturating_add(config.scrollback).min(MAX_CAPACITY);
        let mut lines = CircularBuffer::new(capacity);
        for _ in 0..rows {
            lines.push(Row::blank(cols, Attr::default()));
        }
        let tab_width = config.tab_width.max(1);
        Self {
            cols,
            rows,
            tabs: default_tab_stops(cols, tab_width),
            config,
            lines,
            normal: None,
            ybase: 0,
            ydisp: 0,
            cursor: Cursor::default(),
            saved_cursor: None,
            scroll_top: 0,
            scroll_bottom: rows - 1,
            attr: Attr::default(),
            charsets: [Charset::Ascii; 4],
            glevel: 0,
            modes: Modes::default(),
            title: String::new(),
            icon_name: String::new(),
            events: Vec::new(),
            dirty: None,
            trimmed: 0,
            last_print: None,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Absolute row where the viewport starts.
    pub fn ybase(&self) -> usize {
        self.ybase
    }

    /// Absolute row the display is scrolled to.
    pub fn ydisp(&self) -> usize {
        self.ydisp
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon_name(&self) -> &str {
        &self.icon_name
    }

    /// Total rows held, scrollback included.
    pub fn total_rows(&self) -> usize {
        self.lines.len()
    }

    /// Row by absolute index.
    pub fn line(&self, row: usize) -> Option<&Row> {
        self.lines.get(row)
    }

    /// Row by display index (relative to `ydisp`), for rendering.
    pub fn display_line(&self, y: usize) -> Option<&Row> {
        self.lines.get(self.ydisp + y)
    }

    /// Cell by viewport-relative coordinates.
    pub fn cell(&self, y: usize, x: usize) -> Option<&Cell> {
        self.lines.get(self.ybase + y).and_then(|row| row.get(x))
    }

    /// Trimmed text of a viewport row.
    pub fn row_text(&self, y: usize) -> String {
        self.lines
            .get(self.ybase + y)
            .map(|row| row.text(true))
            .unwrap_or_default()
    }

    // ---- events, dirty tracking, trim accounting ----

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn mark_dirty(&mut self, y: usize) {
        self.mark_dirty_range(y, y);
    }

    pub(crate) fn mark_dirty_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.rows.saturating_sub(1));
        let start = start.min(end);
        self.dirty = Some(match self.dirty {
            Some((s, e)) => (s.min(start), e.max(end)),
            None => (start, end),
        });
    }

    pub(crate) fn mark_all_dirty(&mut self) {
        self.mark_dirty_range(0, self.rows.saturating_sub(1));
    }

    /// Dirty viewport row range since the last call, if any.
    pub fn take_dirty(&mut self) -> Option<(usize, usize)> {
        self.dirty.take()
    }

    /// Rows trimmed from the scrollback since the last call.
    pub fn take_trimmed(&mut self) -> usize {
        std::mem::take(&mut self.trimmed)
    }

    fn apply_trim(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.ybase = self.ybase.saturating_sub(count);
        self.ydisp = self.ydisp.saturating_sub(count);
        self.trimmed += count;
    }

    // ---- titles ----

    pub(crate) fn set_title(&mut self, title: &str) {
        if self.title != title {
            self.title = title.to_string();
            self.emit(Event::TitleChanged(title.to_string()));
        }
    }

    pub(crate) fn set_icon_name(&mut self, name: &str) {
        if self.icon_name != name {
            self.icon_name = name.to_string();
            self.emit(Event::IconNameChanged(name.to_string()));
        }
    }

    // ---- charsets ----

    pub(crate) fn designate_charset(&mut self, slot: usize, charset: Charset) {
        if let Some(entry) = self.charsets.get_mut(slot) {
            *entry = charset;
        }
    }

    pub(crate) fn set_glevel(&mut self, level: usize) {
        if level < 4 {
            self.glevel = level;
        }
    }

    /// Translate a printable through the active charset.
    pub(crate) fn translate(&self, c: char) -> char {
        self.charsets[self.glevel].map(c)
    }

    // ---- printing ----

    /// Write one printable character at the cursor, handling width,
    /// combining marks, insert mode and wrapping.
    pub fn put_char(&mut self, c: char) {
        let width = char_width(c) as usize;
        if width == 0 {
            self.put_combining(c);
            return;
        }
        // a glyph wider than the screen cannot be placed at all
        if width > self.cols {
            return;
        }

        if self.cursor.x + width > self.cols {
            if self.modes.wraparound {
                self.cursor.x = 0;
                if self.cursor.y == self.scroll_bottom {
                    self.scroll();
                } else if self.cursor.y + 1 < self.rows {
                    self.cursor.y += 1;
                }
                let abs = self.ybase + self.cursor.y;
                if let Some(row) = self.lines.get_mut(abs) {
                    row.wrapped = true;
                }
            } else {
                // no autowrap: the write is dropped
                return;
            }
        }

        let x = self.cursor.x;
        let y = self.cursor.y;
        let abs = self.ybase + y;
        let attr = self.attr;
        let erase = attr.erase();
        let insert = self.modes.insert;
        let cols = self.cols;

        if let Some(row) = self.lines.get_mut(abs) {
            if insert {
                row.insert_cells(x, width, erase);
            }
            // overwriting half of a wide pair blanks the other half
            if row.get(x).is_some_and(|cell| cell.is_spacer()) && x > 0 {
                let lead_attr = row[x - 1].attr;
                row[x - 1] = Cell::blank(lead_attr);
            }
            if row.get(x).is_some_and(|cell| cell.is_wide()) && x + 1 < cols {
                let spacer_attr = row[x + 1].attr;
                row[x + 1] = Cell::blank(spacer_attr);
            }
            row[x] = Cell::new(c, width as u8, attr);
            if width == 2 {
                row[x + 1] = Cell::wide_spacer(attr);
            }
        }

        self.cursor.x += width;
        self.last_print = Some((self.cursor.x, y, c));
        self.mark_dirty(y);
    }

    /// Merge a zero-width character into the preceding cell, reaching
    /// back across a soft wrap when the cursor sits at column 0.
    fn put_combining(&mut self, c: char) {
        let (abs, col) = if self.cursor.x > 0 {
            let x = self.cursor.x.min(self.cols) - 1;
            (self.ybase + self.cursor.y, x)
        } else {
            let abs = self.ybase + self.cursor.y;
            let continuation = self.lines.get(abs).map(|row| row.wrapped).unwrap_or(false);
            if !continuation || abs == 0 {
                return;
            }
            (abs - 1, self.cols - 1)
        };
        let y = abs.saturating_sub(self.ybase);
        if let Some(row) = self.lines.get_mut(abs) {
            // a spacer resolves to its wide lead
            let col = if row.get(col).is_some_and(|cell| cell.is_spacer()) && col > 0 {
                col - 1
            } else {
                col
            };
            if let Some(cell) = row.get_mut(col) {
                cell.push_combining(c);
            }
        }
        self.mark_dirty(y);
    }

    /// Repeat the last printed character (REP), provided the cursor has
    /// not moved since it was printed.
    pub fn repeat_last(&mut self, count: usize) {
        if let Some((x, y, c)) = self.last_print {
            if x == self.cursor.x && y == self.cursor.y {
                for _ in 0..count {
                    self.put_char(c);
                }
            }
        }
    }

    // ---- cursor movement ----

    pub fn carriage_return(&mut self) {
        self.cursor.x = 0;
    }

    pub fn backspace(&mut self) {
        if self.cursor.x > 0 {
            self.cursor.x -= 1;
        }
    }

    /// Index: move down one row, scrolling at the bottom of the region.
    pub fn index(&mut self) {
        if self.cursor.y == self.scroll_bottom {
            self.scroll();
        } else if self.cursor.y + 1 < self.rows {
            self.cursor.y += 1;
        }
    }

    /// Line feed: index, plus carriage return when EOL conversion is on.
    pub fn linefeed(&mut self) {
        if self.config.convert_eol {
            self.cursor.x = 0;
        }
        self.index();
        self.emit(Event::LineFeed);
    }

    /// Reverse index: move up, scrolling down at the top of the region.
    pub fn reverse_index(&mut self) {
        if self.cursor.y == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.y > 0 {
            self.cursor.y -= 1;
        }
    }

    /// Absolute positioning (CUP/HVP), honoring origin mode.
    pub fn set_cursor(&mut self, x: usize, y: usize) {
        let y = if self.modes.origin {
            (self.scroll_top + y).min(self.scroll_bottom)
        } else {
            y.min(self.rows - 1)
        };
        self.cursor.x = x.min(self.cols - 1);
        self.cursor.y = y;
    }

    pub fn set_cursor_col(&mut self, x: usize) {
        self.cursor.x = x.min(self.cols - 1);
    }

    pub fn set_cursor_row(&mut self, y: usize) {
        let y = if self.modes.origin {
            (self.scroll_top + y).min(self.scroll_bottom)
        } else {
            y.min(self.rows - 1)
        };
        self.cursor.y = y;
    }

    /// Relative movement, clamped to the viewport.
    pub fn move_cursor(&mut self, dy: isize, dx: isize) {
        let x = self.cursor.x.min(self.cols - 1) as isize + dx;
        let y = self.cursor.y as isize + dy;
        self.cursor.x = x.clamp(0, self.cols as isize - 1) as usize;
        self.cursor.y = y.clamp(0, self.rows as isize - 1) as usize;
    }

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            x: self.cursor.x,
            y: self.cursor.y,
            attr: self.attr,
            charsets: self.charsets,
            glevel: self.glevel,
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor.clone() {
            self.cursor.x = saved.x.min(self.cols - 1);
            self.cursor.y = saved.y.min(self.rows - 1);
            self.attr = saved.attr;
            self.charsets = saved.charsets;
            self.glevel = saved.glevel;
        } else {
            self.cursor.x = 0;
            self.cursor.y = 0;
        }
    }

    // ---- tab stops ----

    pub fn tab_forward(&mut self, count: usize) {
        for _ in 0..count {
            let mut x = self.cursor.x.min(self.cols - 1);
            loop {
                x += 1;
                if x >= self.cols - 1 || self.tabs.get(x).copied().unwrap_or(false) {
                    break;
                }
            }
            self.cursor.x = x.min(self.cols - 1);
        }
    }

    pub fn tab_backward(&mut self, count: usize) {
        for _ in 0..count {
            let mut x = self.cursor.x.min(self.cols - 1);
            while x > 0 {
                x -= 1;
                if self.tabs.get(x).copied().unwrap_or(false) {
                    break;
                }
            }
            self.cursor.x = x;
        }
    }

    /// Set a tab stop at the cursor column (HTS).
    pub fn set_tab_stop(&mut self) {
        let x = self.cursor.x.min(self.cols - 1);
        if let Some(stop) = self.tabs.get_mut(x) {
            *stop = true;
        }
    }

    /// Clear the tab stop at the cursor column (TBC 0).
    pub fn clear_tab_stop(&mut self) {
        let x = self.cursor.x.min(self.cols - 1);
        if let Some(stop) = self.tabs.get_mut(x) {
            *stop = false;
        }
    }

    /// Clear every tab stop (TBC 3).
    pub fn clear_all_tab_stops(&mut self) {
        for stop in &mut self.tabs {
            *stop = false;
        }
    }

    // ---- scrolling ----

    /// Scroll the region up one row. When the region top is the
    /// viewport top the displaced row becomes scrollback; a partial
    /// region recycles its rows in place.
    pub fn scroll(&mut self) {
        let following = self.ydisp == self.ybase;
        let bottom_row = self.ybase + self.scroll_bottom;
        if self.scroll_top == 0 {
            let blank = Row::blank(self.cols, Attr::default());
            let trimmed = if bottom_row == self.lines.len() - 1 {
                self.lines.push(blank)
            } else {
                self.lines.splice(bottom_row + 1, 0, vec![blank])
            };
            if trimmed == 0 {
                self.ybase += 1;
                if following {
                    self.ydisp = self.ybase;
                }
            } else {
                // the ring dropped as many rows as were added, so the
                // viewport base already points at the shifted content
                self.trimmed += trimmed;
                if !following {
                    self.ydisp = self.ydisp.saturating_sub(trimmed);
                }
            }
        } else {
            let top_row = self.ybase + self.scroll_top;
            let height = bottom_row - top_row;
            if height > 0 {
                self.lines.shift_elements(top_row + 1, height, -1);
            }
            self.lines.set(bottom_row, Row::blank(self.cols, Attr::default()));
        }
        self.mark_dirty_range(self.scroll_top, self.scroll_bottom);
        let ydisp = self.ydisp;
        self.emit(Event::Scroll { ydisp });
    }

    /// SU: shift the region up `count` rows; blanks enter at the bottom.
    pub fn scroll_up(&mut self, count: usize) {
        for _ in 0..count {
            let remove_at = self.ybase + self.scroll_top;
            self.lines.splice(remove_at, 1, Vec::new());
            let insert_at = self.ybase + self.scroll_bottom;
            let blank = Row::blank(self.cols, self.attr.erase());
            self.lines.splice(insert_at, 0, vec![blank]);
        }
        self.mark_dirty_range(self.scroll_top, self.scroll_bottom);
    }

    /// SD: shift the region down `count` rows; blanks enter at the top.
    pub fn scroll_down(&mut self, count: usize) {
        for _ in 0..count {
            let remove_at = self.ybase + self.scroll_bottom;
            self.lines.splice(remove_at, 1, Vec::new());
            let insert_at = self.ybase + self.scroll_top;
            let blank = Row::blank(self.cols, self.attr.erase());
            self.lines.splice(insert_at, 0, vec![blank]);
        }
        self.mark_dirty_range(self.scroll_top, self.scroll_bottom);
    }

    /// Set the scroll region (DECSTBM), viewport-relative and inclusive.
    /// Invalid regions are ignored.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let bottom = bottom.min(self.rows - 1);
        if top >= bottom {
            log::debug!("Ignoring invalid scroll region {}..{}", top, bottom);
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.set_cursor(0, 0);
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn scroll_bottom(&self) -> usize {
        self.scroll_bottom
    }

    // ---- viewport scrolling (user driven) ----

    /// Scroll the display by `delta` rows (negative = into history).
    pub fn scroll_display(&mut self, delta: isize) {
        let new = if delta < 0 {
            self.ydisp.saturating_sub(delta.unsigned_abs())
        } else {
            (self.ydisp + delta as usize).min(self.ybase)
        };
        if new != self.ydisp {
            self.ydisp = new;
            self.mark_all_dirty();
            self.emit(Event::Scroll { ydisp: new });
        }
    }

    pub fn scroll_pages(&mut self, pages: isize) {
        self.scroll_display(pages * (self.rows as isize - 1));
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_display(-(self.ydisp as isize));
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_display(self.ybase as isize - self.ydisp as isize);
    }

    pub fn is_scrolled(&self) -> bool {
        self.ydisp < self.ybase
    }

    // ---- erasing and editing ----

    fn erase_attr(&self) -> Attr {
        self.attr.erase()
    }

    /// ED: erase part of the display.
    pub fn clear(&mut self, mode: ClearMode) {
        let attr = self.erase_attr();
        match mode {
            ClearMode::Below => {
                let y = self.cursor.y;
                let x = self.cursor.x;
                if let Some(row) = self.lines.get_mut(self.ybase + y) {
                    row.erase(x, self.cols, attr);
                }
                for vy in y + 1..self.rows {
                    if let Some(row) = self.lines.get_mut(self.ybase + vy) {
                        row.fill(attr);
                        row.wrapped = false;
                    }
                }
                self.mark_dirty_range(y, self.rows - 1);
            }
            ClearMode::Above => {
                let y = self.cursor.y;
                let x = self.cursor.x;
                for vy in 0..y {
                    if let Some(row) = self.lines.get_mut(self.ybase + vy) {
                        row.fill(attr);
                        row.wrapped = false;
                    }
                }
                if let Some(row) = self.lines.get_mut(self.ybase + y) {
                    row.erase(0, (x + 1).min(self.cols), attr);
                }
                self.mark_dirty_range(0, y);
            }
            ClearMode::All => {
                for vy in 0..self.rows {
                    if let Some(row) = self.lines.get_mut(self.ybase + vy) {
                        row.fill(attr);
                        row.wrapped = false;
                    }
                }
                self.mark_all_dirty();
            }
            ClearMode::Scrollback => {
                let above = self.ybase;
                if above > 0 {
                    self.lines.trim_start(above);
                    self.apply_trim(above);
                    let ydisp = self.ydisp;
                    self.emit(Event::Scroll { ydisp });
                    self.mark_all_dirty();
                }
            }
        }
    }

    /// EL: erase part of the cursor row.
    pub fn clear_line(&mut self, mode: ClearLineMode) {
        let attr = self.erase_attr();
        let y = self.cursor.y;
        let x = self.cursor.x;
        let cols = self.cols;
        if let Some(row) = self.lines.get_mut(self.ybase + y) {
            match mode {
                ClearLineMode::Right => row.erase(x, cols, attr),
                ClearLineMode::Left => row.erase(0, (x + 1).min(cols), attr),
                ClearLineMode::All => row.fill(attr),
            }
        }
        self.mark_dirty(y);
    }

    /// ICH: insert blank cells at the cursor.
    pub fn insert_chars(&mut self, count: usize) {
        let attr = self.erase_attr();
        let y = self.cursor.y;
        let x = self.cursor.x.min(self.cols - 1);
        if let Some(row) = self.lines.get_mut(self.ybase + y) {
            row.insert_cells(x, count, attr);
        }
        self.mark_dirty(y);
    }

    /// DCH: delete cells at the cursor, pulling the tail left.
    pub fn delete_chars(&mut self, count: usize) {
        let attr = self.erase_attr();
        let y = self.cursor.y;
        let x = self.cursor.x.min(self.cols - 1);
        if let Some(row) = self.lines.get_mut(self.ybase + y) {
            row.delete_cells(x, count, attr);
        }
        self.mark_dirty(y);
    }

    /// ECH: blank cells at the cursor without shifting.
    pub fn erase_chars(&mut self, count: usize) {
        let attr = self.erase_attr();
        let y = self.cursor.y;
        let x = self.cursor.x.min(self.cols - 1);
        let end = (x + count.max(1)).min(self.cols);
        if let Some(row) = self.lines.get_mut(self.ybase + y) {
            row.erase(x, end, attr);
        }
        self.mark_dirty(y);
    }

    /// IL: insert blank rows at the cursor, pushing the region tail out.
    pub fn insert_lines(&mut self, count: usize) {
        if self.cursor.y < self.scroll_top || self.cursor.y > self.scroll_bottom {
            return;
        }
        let attr = self.erase_attr();
        for _ in 0..count.max(1) {
            // remove first so the buffer length stays constant and
            // nothing spills into the scrollback
            let remove_at = self.ybase + self.scroll_bottom;
            self.lines.splice(remove_at, 1, Vec::new());
            let insert_at = self.ybase + self.cursor.y;
            self.lines.splice(insert_at, 0, vec![Row::blank(self.cols, attr)]);
        }
        self.cursor.x = 0;
        self.mark_dirty_range(self.cursor.y, self.scroll_bottom);
    }

    /// DL: delete rows at the cursor, pulling blanks in at the region
    /// bottom.
    pub fn delete_lines(&mut self, count: usize) {
        if self.cursor.y < self.scroll_top || self.cursor.y > self.scroll_bottom {
            return;
        }
        let attr = self.erase_attr();
        for _ in 0..count.max(1) {
            let remove_at = self.ybase + self.cursor.y;
            self.lines.splice(remove_at, 1, Vec::new());
            let insert_at = self.ybase + self.scroll_bottom;
            self.lines.splice(insert_at, 0, vec![Row::blank(self.cols, attr)]);
        }
        self.cursor.x = 0;
        self.mark_dirty_range(self.cursor.y, self.scroll_bottom);
    }

    // ---- alternate screen ----

    /// Switch to a fresh alternate screen, stashing the primary.
    pub fn enter_alternate(&mut self) {
        if self.normal.is_some() {
            return;
        }
        let mut alt = CircularBuffer::new(self.rows);
        for _ in 0..self.rows {
            alt.push(Row::blank(self.cols, Attr::default()));
        }
        let stash = NormalState {
            lines: std::mem::replace(&mut self.lines, alt),
            ybase: std::mem::take(&mut self.ybase),
            ydisp: std::mem::take(&mut self.ydisp),
            scroll_top: std::mem::replace(&mut self.scroll_top, 0),
            scroll_bottom: std::mem::replace(&mut self.scroll_bottom, self.rows - 1),
            tabs: std::mem::replace(
                &mut self.tabs,
                default_tab_stops(self.cols, self.config.tab_width.max(1)),
            ),
            cursor: self.cursor.clone(),
        };
        self.normal = Some(Box::new(stash));
        self.modes.alternate_screen = true;
        self.cursor.x = 0;
        self.cursor.y = 0;
        self.mark_all_dirty();
    }

    /// Return to the primary screen, dropping alternate content.
    pub fn exit_alternate(&mut self) {
        let Some(stash) = self.normal.take() else {
            return;
        };
        let stash = *stash;
        self.lines = stash.lines;
        self.ybase = stash.ybase;
        self.ydisp = stash.ydisp;
        self.scroll_top = stash.scroll_top.min(self.rows - 1);
        self.scroll_bottom = stash.scroll_bottom.min(self.rows - 1);
        self.tabs = stash.tabs;
        self.cursor = stash.cursor;
        self.cursor.x = self.cursor.x.min(self.cols - 1);
        self.cursor.y = self.cursor.y.min(self.rows - 1);
        self.modes.alternate_screen = false;
        self.mark_all_dirty();
    }

    // ---- markers ----

    /// Attach a marker `offset` rows from the cursor row.
    pub fn add_marker(&mut self, offset: isize) -> Marker {
        let base = (self.ybase + self.cursor.y) as isize + offset;
        let row = base.clamp(0, self.lines.len().saturating_sub(1) as isize) as usize;
        self.lines.add_marker(row)
    }

    /// Absolute row of a marker, if still alive.
    pub fn marker_row(&self, marker: Marker) -> Option<usize> {
        self.lines.marker_row(marker)
    }

    pub fn dispose_marker(&mut self, marker: Marker) {
        self.lines.dispose_marker(marker);
    }

    // ---- resize ----

    /// Change the geometry, preserving content. Growing the row count
    /// reveals scrollback; shrinking drops rows below the cursor before
    /// pushing rows into scrollback.
    pub fn resize(&mut self, new_cols: usize, new_rows: usize) {
        let new_cols = new_cols.max(1);
        let new_rows = new_rows.max(1);
        if new_cols == self.cols && new_rows == self.rows {
            return;
        }

        // keep the stashed primary screen in step so exiting the
        // alternate screen lands on the right geometry
        if let Some(mut stash) = self.normal.take() {
            resize_buffer(
                &mut stash.lines,
                &mut stash.cursor,
                &mut stash.ybase,
                &mut stash.ydisp,
                self.cols,
                self.rows,
                new_cols,
                new_rows,
                self.config.scrollback,
            );
            stash.scroll_top = 0;
            stash.scroll_bottom = new_rows - 1;
            stash.tabs = resized_tabs(&stash.tabs, new_cols, self.config.tab_width.max(1));
            self.normal = Some(stash);
        }

        let scrollback = if self.modes.alternate_screen {
            0
        } else {
            self.config.scrollback
        };
        let trimmed = resize_buffer(
            &mut self.lines,
            &mut self.cursor,
            &mut self.ybase,
            &mut self.ydisp,
            self.cols,
            self.rows,
            new_cols,
            new_rows,
            scrollback,
        );
        self.trimmed += trimmed;

        self.tabs = resized_tabs(&self.tabs, new_cols, self.config.tab_width.max(1));
        self.scroll_top = 0;
        self.scroll_bottom = new_rows - 1;
        if let Some(saved) = &mut self.saved_cursor {
            saved.x = saved.x.min(new_cols - 1);
            saved.y = saved.y.min(new_rows - 1);
        }
        self.cols = new_cols;
        self.rows = new_rows;
        self.last_print = None;
        self.mark_all_dirty();
        self.emit(Event::Resize {
            cols: new_cols,
            rows: new_rows,
        });
    }

    // ---- reset ----

    /// Full reset (RIS): fresh buffer, default state. The title is left
    /// alone.
    pub fn reset(&mut self) {
        let config = self.config.clone();
        let cols = self.cols;
        let rows = self.rows;
        let title = std::mem::take(&mut self.title);
        let icon_name = std::mem::take(&mut self.icon_name);
        let events = std::mem::take(&mut self.events);
        *self = Screen::new(cols, rows, config);
        self.title = title;
        self.icon_name = icon_name;
        self.events = events;
        self.mark_all_dirty();
    }

    /// Soft reset (DECSTR): restore sane modes without touching content.
    pub fn soft_reset(&mut self) {
        self.cursor.visible = true;
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        self.modes.origin = false;
        self.modes.insert = false;
        self.modes.wraparound = true;
        self.modes.application_cursor = false;
        self.modes.application_keypad = false;
        self.attr = Attr::default();
        self.charsets = [Charset::Ascii; 4];
        self.glevel = 0;
    }

    // ---- search ----

    /// Find matches in the whole buffer, scrollback included. Literal
    /// searches escape the pattern; regex searches use it as-is.
    pub fn find(
        &self,
        pattern: &str,
        case_sensitive: bool,
        is_regex: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        let source = if is_regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        let re = regex::RegexBuilder::new(&source)
            .case_insensitive(!case_sensitive)
            .build()?;
        let mut results = Vec::new();
        for (abs, row) in self.lines.iter().enumerate() {
            let (text, columns) = row.text_with_columns();
            for m in re.find_iter(&text) {
                let start_char = text[..m.start()].chars().count();
                let match_chars = text[m.start()..m.end()].chars().count();
                if match_chars == 0 {
                    continue;
                }
                let (start_col, _) = columns[start_char];
                let (last_col, last_width) = columns[start_char + match_chars - 1];
                results.push(SearchResult {
                    row: abs,
                    col: start_col,
                    len: last_col + last_width as usize - start_col,
                });
            }
        }
        Ok(results)
    }
}

fn default_tab_stops(cols: usize, tab_width: usize) -> Vec<bool> {
    (0..cols).map(|i| i > 0 && i % tab_width == 0).collect()
}

fn resized_tabs(old: &[bool], new_cols: usize, tab_width: usize) -> Vec<bool> {
    let mut tabs: Vec<bool> = old.iter().copied().take(new_cols).collect();
    let start = tabs.len();
    tabs.resize(new_cols, false);
    for (i, stop) in tabs.iter_mut().enumerate().skip(start) {
        *stop = i > 0 && i % tab_width == 0;
    }
    tabs
}

/// Shared geometry-change logic for the active and stashed buffers.
/// Returns the number of rows trimmed from the scrollback.
#[allow(clippy::too_many_arguments)]
fn resize_buffer(
    lines: &mut CircularBuffer<Row>,
    cursor: &mut Cursor,
    ybase: &mut usize,
    ydisp: &mut usize,
    old_cols: usize,
    old_rows: usize,
    new_cols: usize,
    new_rows: usize,
    scrollback: usize,
) -> usize {
    let mut trimmed = 0;

    if new_cols != old_cols {
        for i in 0..lines.len() {
            if let Some(row) = lines.get_mut(i) {
                row.resize(new_cols, Attr::default());
            }
        }
    }

    let new_capacity = new_rows.saturating_add(scrollback).min(MAX_CAPACITY);
    if new_capacity > lines.max_length() {
        lines.set_max_length(new_capacity);
    }

    if new_rows > old_rows {
        for _ in old_rows..new_rows {
            if *ybase > 0 {
                // reveal a scrollback row at the top
                *ybase -= 1;
                *ydisp = (*ydisp).min(*ybase);
                cursor.y += 1;
            } else {
                lines.push(Row::blank(new_cols, Attr::default()));
            }
        }
    } else if new_rows < old_rows {
        for _ in new_rows..old_rows {
            if lines.len() > *ybase + cursor.y + 1 {
                // a row below the cursor can simply go
                lines.pop();
            } else {
                // otherwise the top viewport row moves into scrollback
                *ybase += 1;
                *ydisp += 1;
            }
        }
    }

    if new_capacity < lines.max_length() {
        let t = lines.set_max_length(new_capacity);
        *ybase = ybase.saturating_sub(t);
        *ydisp = ydisp.saturating_sub(t);
        trimmed += t;
    }

    cursor.x = cursor.x.min(new_cols - 1);
    cursor.y = cursor.y.min(new_rows - 1);
    *ydisp = (*ydisp).min(*ybase);
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::AttrFlags;

    fn make_screen() -> Screen {
        Screen::new(10, 5, ScreenConfig::default())
    }

    fn type_str(screen: &mut Screen, s: &str) {
        for c in s.chars() {
            screen.put_char(c);
        }
    }

    #[test]
    fn test_new_screen_geometry() {
        let screen = make_screen();
        assert_eq!(screen.cols(), 10);
        assert_eq!(screen.rows(), 5);
        assert_eq!(screen.total_rows(), 5);
        assert_eq!(screen.ybase(), 0);
        assert_eq!(screen.cursor.x, 0);
        assert!(screen.cursor.visible);
    }

    #[test]
    fn test_put_char_advances_cursor() {
        let mut screen = make_screen();
        type_str(&mut screen, "hi");
        assert_eq!(screen.row_text(0), "hi");
        assert_eq!(screen.cursor.x, 2);
    }

    #[test]
    fn test_put_char_applies_attr() {
        let mut screen = make_screen();
        screen.attr.insert_flags(AttrFlags::BOLD);
        screen.attr.set_fg(Some(1));
        screen.put_char('x');
        let cell = screen.cell(0, 0).unwrap();
        assert!(cell.attr.contains(AttrFlags::BOLD));
        assert_eq!(cell.attr.fg(), Some(1));
    }

    #[test]
    fn test_wraparound_marks_row() {
        let mut screen = make_screen();
        type_str(&mut screen, "0123456789ab");
        assert_eq!(screen.row_text(0), "0123456789");
        assert_eq!(screen.row_text(1), "ab");
        assert!(screen.line(1).unwrap().wrapped);
        assert_eq!(screen.cursor.y, 1);
        assert_eq!(screen.cursor.x, 2);
    }

    #[test]
    fn test_no_wraparound_drops_overflowing_writes() {
        let mut screen = make_screen();
        screen.modes.wraparound = false;
        type_str(&mut screen, "0123456789XY");
        assert_eq!(screen.row_text(0), "0123456789");
        assert_eq!(screen.cursor.y, 0);
        assert_eq!(screen.cursor.x, 10);
        // a wide glyph that no longer fits must not clobber the
        // row tail either
        screen.put_char('日');
        assert_eq!(screen.row_text(0), "0123456789");
        assert_eq!(screen.cursor.x, 10);
    }

    #[test]
    fn test_wide_char_occupies_two_cells() {
        let mut screen = make_screen();
        screen.put_char('日');
        assert_eq!(screen.cursor.x, 2);
        assert!(screen.cell(0, 0).unwrap().is_wide());
        assert!(screen.cell(0, 1).unwrap().is_spacer());
    }

    #[test]
    fn test_wide_char_wraps_instead_of_splitting() {
        let mut screen = make_screen();
        type_str(&mut screen, "012345678");
        screen.put_char('日');
        // no room at column 9: the wide char starts the next row
        assert_eq!(screen.cell(1, 0).unwrap().ch, '日');
        assert!(screen.line(1).unwrap().wrapped);
    }

    #[test]
    fn test_overwrite_wide_lead_blanks_spacer() {
        let mut screen = make_screen();
        screen.put_char('日');
        screen.set_cursor(0, 0);
        screen.put_char('a');
        assert_eq!(screen.cell(0, 0).unwrap().ch, 'a');
        assert!(!screen.cell(0, 1).unwrap().is_spacer());
        assert_eq!(screen.cell(0, 1).unwrap().ch, ' ');
    }

    #[test]
    fn test_combining_char_merges() {
        let mut screen = make_screen();
        screen.put_char('e');
        screen.put_char('\u{0301}');
        assert_eq!(screen.cell(0, 0).unwrap().text(), "e\u{0301}");
        assert_eq!(screen.cursor.x, 1);
    }

    #[test]
    fn test_combining_at_wrap_boundary() {
        let mut screen = make_screen();
        type_str(&mut screen, "0123456789");
        // cursor is past the last column; accent lands on the just
        // printed '9', not a new row
        screen.put_char('\u{0301}');
        assert_eq!(screen.cell(0, 9).unwrap().text(), "9\u{0301}");
    }

    #[test]
    fn test_insert_mode_shifts_row() {
        let mut screen = make_screen();
        type_str(&mut screen, "abc");
        screen.set_cursor(0, 0);
        screen.modes.insert = true;
        screen.put_char('X');
        assert_eq!(screen.row_text(0), "Xabc");
    }

    #[test]
    fn test_linefeed_scrolls_at_bottom() {
        let mut screen = make_screen();
        for i in 0..5 {
            type_str(&mut screen, &format!("l{}", i));
            if i < 4 {
                screen.linefeed();
                screen.carriage_return();
            }
        }
        assert_eq!(screen.ybase(), 0);
        screen.linefeed();
        assert_eq!(screen.ybase(), 1);
        assert_eq!(screen.total_rows(), 6);
        // oldest row is now scrollback
        assert_eq!(screen.line(0).unwrap().text(true), "l0");
        assert_eq!(screen.row_text(0), "l1");
    }

    #[test]
    fn test_scroll_keeps_display_pinned_when_scrolled_up() {
        let mut screen = make_screen();
        for _ in 0..10 {
            screen.linefeed();
        }
        screen.scroll_display(-3);
        let pinned = screen.ydisp();
        screen.linefeed();
        assert_eq!(screen.ydisp(), pinned);
        screen.scroll_to_bottom();
        assert_eq!(screen.ydisp(), screen.ybase());
    }

    #[test]
    fn test_scroll_region_recycles_rows() {
        let mut screen = make_screen();
        for i in 0..5 {
            screen.set_cursor(0, i);
            type_str(&mut screen, &format!("l{}", i));
        }
        screen.set_scroll_region(1, 3);
        screen.set_cursor(0, 3);
        screen.linefeed();
        // rows outside the region stay put, region shifted up
        assert_eq!(screen.row_text(0), "l0");
        assert_eq!(screen.row_text(1), "l2");
        assert_eq!(screen.row_text(2), "l3");
        assert_eq!(screen.row_text(3), "");
        assert_eq!(screen.row_text(4), "l4");
        // no scrollback growth
        assert_eq!(screen.total_rows(), 5);
    }

    #[test]
    fn test_reverse_index_scrolls_down() {
        let mut screen = make_screen();
        type_str(&mut screen, "top");
        screen.reverse_index();
        assert_eq!(screen.row_text(0), "");
        assert_eq!(screen.row_text(1), "top");
    }

    #[test]
    fn test_insert_delete_lines_respect_region() {
        let mut screen = make_screen();
        for i in 0..5 {
            screen.set_cursor(0, i);
            type_str(&mut screen, &format!("l{}", i));
        }
        screen.set_scroll_region(1, 3);
        screen.set_cursor(0, 1);
        screen.insert_lines(1);
        assert_eq!(screen.row_text(1), "");
        assert_eq!(screen.row_text(2), "l1");
        assert_eq!(screen.row_text(3), "l2");
        // l3 pushed out of the region, l4 untouched
        assert_eq!(screen.row_text(4), "l4");

        screen.delete_lines(1);
        assert_eq!(screen.row_text(1), "l1");
        assert_eq!(screen.row_text(2), "l2");
        assert_eq!(screen.row_text(3), "");
    }

    #[test]
    fn test_clear_below_and_above() {
        let mut screen = make_screen();
        for i in 0..5 {
            screen.set_cursor(0, i);
            type_str(&mut screen, &format!("l{}", i));
        }
        screen.set_cursor(1, 2);
        screen.clear(ClearMode::Below);
        assert_eq!(screen.row_text(2), "l");
        assert_eq!(screen.row_text(3), "");
        assert_eq!(screen.row_text(1), "l1");

        screen.clear(ClearMode::Above);
        assert_eq!(screen.row_text(0), "");
        assert_eq!(screen.row_text(2), "");
    }

    #[test]
    fn test_clear_uses_erase_attr() {
        let mut screen = make_screen();
        type_str(&mut screen, "xx");
        screen.attr.set_bg(Some(4));
        screen.attr.insert_flags(AttrFlags::BOLD);
        screen.clear_line(ClearLineMode::All);
        let cell = screen.cell(0, 0).unwrap();
        assert_eq!(cell.attr.bg(), Some(4));
        assert_eq!(cell.attr.fg(), None);
        assert!(cell.attr.flags().is_empty());
    }

    #[test]
    fn test_clear_scrollback_only() {
        let mut screen = make_screen();
        for _ in 0..8 {
            screen.linefeed();
        }
        type_str(&mut screen, "keep");
        assert_eq!(screen.ybase(), 4);
        screen.clear(ClearMode::Scrollback);
        assert_eq!(screen.ybase(), 0);
        assert_eq!(screen.total_rows(), 5);
        assert_eq!(screen.row_text(4), "keep");
        assert_eq!(screen.take_trimmed(), 4);
    }

    #[test]
    fn test_erase_chars() {
        let mut screen = make_screen();
        type_str(&mut screen, "abcdef");
        screen.set_cursor(1, 0);
        screen.erase_chars(3);
        assert_eq!(screen.row_text(0), "a   ef");
    }

    #[test]
    fn test_tab_stops() {
        let mut screen = Screen::new(20, 5, ScreenConfig::default());
        screen.tab_forward(1);
        assert_eq!(screen.cursor.x, 8);
        screen.tab_forward(1);
        assert_eq!(screen.cursor.x, 16);
        screen.tab_forward(1);
        assert_eq!(screen.cursor.x, 19);
        screen.tab_backward(2);
        assert_eq!(screen.cursor.x, 8);

        screen.set_cursor(4, 0);
        screen.set_tab_stop();
        screen.set_cursor(0, 0);
        screen.tab_forward(1);
        assert_eq!(screen.cursor.x, 4);

        screen.clear_all_tab_stops();
        screen.set_cursor(0, 0);
        screen.tab_forward(1);
        assert_eq!(screen.cursor.x, 19);
    }

    #[test]
    fn test_origin_mode_positioning() {
        let mut screen = make_screen();
        screen.set_scroll_region(1, 3);
        screen.modes.origin = true;
        screen.set_cursor(0, 0);
        assert_eq!(screen.cursor.y, 1);
        screen.set_cursor(0, 10);
        assert_eq!(screen.cursor.y, 3);
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut screen = make_screen();
        screen.set_cursor(3, 2);
        screen.attr.insert_flags(AttrFlags::UNDERLINE);
        screen.save_cursor();
        screen.set_cursor(0, 0);
        screen.attr = Attr::default();
        screen.restore_cursor();
        assert_eq!(screen.cursor.x, 3);
        assert_eq!(screen.cursor.y, 2);
        assert!(screen.attr.contains(AttrFlags::UNDERLINE));
    }

    #[test]
    fn test_alternate_screen_round_trip() {
        let mut screen = make_screen();
        type_str(&mut screen, "primary");
        screen.set_cursor(3, 1);
        screen.enter_alternate();
        assert!(screen.modes.alternate_screen);
        assert_eq!(screen.row_text(0), "");
        assert_eq!(screen.cursor.x, 0);
        type_str(&mut screen, "alt");
        screen.exit_alternate();
        assert!(!screen.modes.alternate_screen);
        assert_eq!(screen.row_text(0), "primary");
        assert_eq!(screen.cursor.x, 3);
        assert_eq!(screen.cursor.y, 1);
    }

    #[test]
    fn test_alternate_screen_has_no_scrollback() {
        let mut screen = make_screen();
        screen.enter_alternate();
        for _ in 0..20 {
            screen.linefeed();
        }
        assert_eq!(screen.ybase(), 0);
        assert_eq!(screen.total_rows(), 5);
    }

    #[test]
    fn test_markers_shift_and_dispose() {
        let mut screen = Screen::new(10, 2, ScreenConfig { scrollback: 3, ..Default::default() });
        let marker = screen.add_marker(0);
        assert_eq!(screen.marker_row(marker), Some(0));
        for _ in 0..4 {
            screen.linefeed();
        }
        // buffer now full at 5 rows; marker still on its row
        assert_eq!(screen.marker_row(marker), Some(0));
        // the next scroll trims the marker's row away
        screen.linefeed();
        assert_eq!(screen.marker_row(marker), None);
    }

    #[test]
    fn test_resize_wider_pads_rows() {
        let mut screen = make_screen();
        type_str(&mut screen, "abc");
        screen.resize(15, 5);
        assert_eq!(screen.cols(), 15);
        assert_eq!(screen.line(0).unwrap().len(), 15);
        assert_eq!(screen.row_text(0), "abc");
    }

    #[test]
    fn test_resize_narrower_truncates() {
        let mut screen = make_screen();
        type_str(&mut screen, "0123456789");
        screen.resize(4, 5);
        assert_eq!(screen.row_text(0), "0123");
        assert!(screen.cursor.x < 4);
    }

    #[test]
    fn test_resize_taller_reveals_scrollback() {
        let mut screen = make_screen();
        for i in 0..8 {
            type_str(&mut screen, &format!("l{}", i));
            if i < 7 {
                screen.linefeed();
                screen.carriage_return();
            }
        }
        assert_eq!(screen.ybase(), 3);
        let cursor_row_before = screen.row_text(screen.cursor.y);
        screen.resize(10, 8);
        assert_eq!(screen.ybase(), 0);
        assert_eq!(screen.row_text(0), "l0");
        assert_eq!(screen.row_text(7), "l7");
        assert_eq!(screen.row_text(screen.cursor.y), cursor_row_before);
    }

    #[test]
    fn test_resize_shorter_prefers_blank_rows_below_cursor() {
        let mut screen = make_screen();
        type_str(&mut screen, "top");
        // cursor on row 0, rows 1-4 blank
        screen.resize(10, 3);
        assert_eq!(screen.ybase(), 0);
        assert_eq!(screen.row_text(0), "top");
        assert_eq!(screen.total_rows(), 3);
    }

    #[test]
    fn test_resize_shorter_with_cursor_at_bottom() {
        let mut screen = make_screen();
        for i in 0..5 {
            type_str(&mut screen, &format!("l{}", i));
            if i < 4 {
                screen.linefeed();
                screen.carriage_return();
            }
        }
        screen.resize(10, 3);
        // top rows became scrollback, cursor stays on its row
        assert_eq!(screen.ybase(), 2);
        assert_eq!(screen.row_text(screen.cursor.y), "l4");
        assert_eq!(screen.line(0).unwrap().text(true), "l0");
    }

    #[test]
    fn test_resize_shorter_disposes_markers_on_dropped_rows() {
        let mut screen = make_screen();
        for i in 0..5 {
            type_str(&mut screen, &format!("l{}", i));
            if i < 4 {
                screen.linefeed();
                screen.carriage_return();
            }
        }
        let bottom = screen.add_marker(0);
        let top = screen.add_marker(-4);
        screen.set_cursor_row(0);
        screen.set_cursor_col(0);
        screen.resize(10, 3);
        // the popped bottom rows must not leave their markers resolving
        // to whatever row later lands at the same index
        assert_eq!(screen.marker_row(bottom), None);
        assert_eq!(screen.marker_row(top), Some(0));
        screen.linefeed();
        screen.linefeed();
        screen.linefeed();
        assert_eq!(screen.marker_row(bottom), None);
    }

    #[test]
    fn test_reset_clears_state_but_keeps_title() {
        let mut screen = make_screen();
        type_str(&mut screen, "data");
        screen.set_title("shell");
        screen.modes.origin = true;
        screen.reset();
        assert_eq!(screen.row_text(0), "");
        assert!(!screen.modes.origin);
        assert_eq!(screen.title(), "shell");
    }

    #[test]
    fn test_soft_reset_restores_modes() {
        let mut screen = make_screen();
        type_str(&mut screen, "data");
        screen.cursor.visible = false;
        screen.modes.origin = true;
        screen.modes.wraparound = false;
        screen.set_scroll_region(1, 3);
        screen.soft_reset();
        assert!(screen.cursor.visible);
        assert!(!screen.modes.origin);
        assert!(screen.modes.wraparound);
        assert_eq!(screen.scroll_top(), 0);
        assert_eq!(screen.scroll_bottom(), 4);
        // content untouched
        assert_eq!(screen.row_text(0), "data");
    }

    #[test]
    fn test_repeat_last_guards_position() {
        let mut screen = make_screen();
        screen.put_char('a');
        screen.repeat_last(3);
        assert_eq!(screen.row_text(0), "aaaa");
        // movement invalidates the repeat
        screen.set_cursor(0, 1);
        screen.repeat_last(2);
        assert_eq!(screen.row_text(1), "");
    }

    #[test]
    fn test_find_literal_and_regex() {
        let mut screen = make_screen();
        type_str(&mut screen, "error 42");
        screen.linefeed();
        screen.carriage_return();
        type_str(&mut screen, "Error 7");

        let hits = screen.find("error", true, false).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].row, 0);

        let hits = screen.find("error", false, false).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = screen.find(r"\d+", true, true).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].col, 6);
        assert_eq!(hits[0].len, 2);

        assert!(screen.find("(unclosed", true, true).is_err());
    }

    #[test]
    fn test_find_reports_display_columns_for_wide_chars() {
        let mut screen = make_screen();
        type_str(&mut screen, "日本ab");
        let hits = screen.find("ab", true, false).unwrap();
        assert_eq!(hits[0].col, 4);
        let hits = screen.find("日本", true, false).unwrap();
        assert_eq!(hits[0].col, 0);
        assert_eq!(hits[0].len, 4);
    }

    #[test]
    fn test_one_by_one_geometry_survives_output() {
        let mut screen = Screen::new(1, 1, ScreenConfig { scrollback: 2, ..Default::default() });
        for c in "abc".chars() {
            screen.put_char(c);
            screen.linefeed();
        }
        assert!(screen.total_rows() <= 3);
        assert_eq!(screen.cursor.y, 0);
        assert_eq!(screen.ybase(), 2);
        assert_eq!(screen.row_text(0), "");
    }
}
