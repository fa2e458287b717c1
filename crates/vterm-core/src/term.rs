//! Terminal facade
//!
//! [`Terminal`] ties the parser, screen, palette, selection and input
//! encoders together behind one host-facing API. Output bytes are
//! queued by [`Terminal::write`] and processed in bounded batches by
//! [`Terminal::tick`], with flow control events telling the host when
//! to pause and resume the source. State changes surface as [`Event`]s.

use crate::buffer::Marker;
use crate::color::{ColorPalette, PaletteMatcher};
use crate::event::{Event, EventSink, FlowControl};
use crate::handler::Handler;
use crate::input::{self, Key, Modifiers, MouseButton, MouseEventKind};
use crate::parser::Parser;
use crate::screen::{Cursor, Screen, ScreenConfig, SearchError, SearchResult};
use crate::selection::{Position, Selection, SelectionMode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Queued chunks at which the host is asked to pause the source.
const WRITE_PAUSE_THRESHOLD: usize = 5;
/// Chunks processed per tick.
const WRITE_BATCH_SIZE: usize = 300;

/// Terminal construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TermOptions {
    pub cols: usize,
    pub rows: usize,
    pub screen: ScreenConfig,
    /// Use the light palette instead of the dark one
    pub light_theme: bool,
}

impl Default for TermOptions {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            screen: ScreenConfig::default(),
            light_theme: false,
        }
    }
}

/// A complete virtual terminal.
pub struct Terminal {
    options: TermOptions,
    screen: Screen,
    parser: Parser,
    palette: ColorPalette,
    colors: PaletteMatcher,
    selection: Selection,
    write_queue: VecDeque<Vec<u8>>,
    paused: bool,
}

impl Terminal {
    pub fn new(options: TermOptions) -> Self {
        let palette = if options.light_theme {
            ColorPalette::default_light()
        } else {
            ColorPalette::default_dark()
        };
        let screen = Screen::new(options.cols, options.rows, options.screen.clone());
        let colors = PaletteMatcher::new(&palette);
        Self {
            options,
            screen,
            parser: Parser::new(),
            palette,
            colors,
            selection: Selection::new(),
            write_queue: VecDeque::new(),
            paused: false,
        }
    }

    pub fn options(&self) -> &TermOptions {
        &self.options
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn cols(&self) -> usize {
        self.screen.cols()
    }

    pub fn rows(&self) -> usize {
        self.screen.rows()
    }

    pub fn cursor(&self) -> &Cursor {
        &self.screen.cursor
    }

    pub fn title(&self) -> &str {
        self.screen.title()
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Swap the palette; truecolor matching and rendering follow it.
    pub fn set_palette(&mut self, palette: ColorPalette) {
        self.colors = PaletteMatcher::new(&palette);
        self.palette = palette;
        self.screen.mark_all_dirty();
    }

    // ---- output processing ----

    /// Queue application output. Once the backlog reaches the pause
    /// threshold a [`FlowControl::Pause`] event is emitted; the host
    /// should stop reading the source until the matching resume.
    pub fn write(&mut self, data: Vec<u8>) {
        self.write_queue.push_back(data);
        if !self.paused && self.write_queue.len() >= WRITE_PAUSE_THRESHOLD {
            self.paused = true;
            self.screen.emit(Event::FlowControl(FlowControl::Pause));
        }
    }

    /// True while the host has been asked to pause the source.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_pending_output(&self) -> bool {
        !self.write_queue.is_empty()
    }

    /// Process a bounded batch of queued output and return the events
    /// it produced. Call repeatedly until [`has_pending_output`] is
    /// false.
    ///
    /// [`has_pending_output`]: Terminal::has_pending_output
    pub fn tick(&mut self) -> Vec<Event> {
        let before = self.cursor_state();
        for _ in 0..WRITE_BATCH_SIZE {
            let Some(chunk) = self.write_queue.pop_front() else {
                break;
            };
            let mut handler = Handler::new(&mut self.screen, &mut self.colors);
            self.parser.process(&mut handler, &chunk);
        }
        if self.paused && self.write_queue.is_empty() {
            self.paused = false;
            self.screen.emit(Event::FlowControl(FlowControl::Resume));
        }
        self.collect_events(before)
    }

    /// Run a tick and hand each event to `sink`.
    pub fn tick_into(&mut self, sink: &mut impl EventSink) {
        for event in self.tick() {
            sink.emit(event);
        }
    }

    /// Write and fully process `data`, returning every event produced.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Event> {
        self.write(data.to_vec());
        let mut events = self.tick();
        while self.has_pending_output() {
            events.extend(self.tick());
        }
        events
    }

    fn cursor_state(&self) -> (usize, usize, usize) {
        (self.screen.cursor.x, self.screen.cursor.y, self.screen.ybase())
    }

    fn collect_events(&mut self, before: (usize, usize, usize)) -> Vec<Event> {
        let trimmed = self.screen.take_trimmed();
        if trimmed > 0 {
            self.selection.on_trim(trimmed);
        }
        let mut events = self.screen.take_events();
        if let Some((start, end)) = self.screen.take_dirty() {
            events.push(Event::Refresh { start, end });
        }
        if self.cursor_state() != before {
            events.push(Event::CursorMove);
        }
        events
    }

    // ---- geometry ----

    /// Resize the terminal. The selection is dropped; content and
    /// cursor follow the rules in [`Screen::resize`].
    pub fn resize(&mut self, cols: usize, rows: usize) -> Vec<Event> {
        let before = self.cursor_state();
        self.selection.clear();
        self.screen.resize(cols, rows);
        self.options.cols = self.screen.cols();
        self.options.rows = self.screen.rows();
        self.collect_events(before)
    }

    // ---- input ----

    /// Encode a key press for the application, scrolling the view back
    /// to the prompt the way terminals do on typing.
    pub fn key(&mut self, key: Key, mods: Modifiers) -> Option<Vec<u8>> {
        let bytes = input::encode_key(key, mods, &self.screen.modes)?;
        self.screen.scroll_to_bottom();
        Some(bytes)
    }

    pub fn paste(&mut self, data: &str) -> Vec<u8> {
        self.screen.scroll_to_bottom();
        input::encode_paste(data, &self.screen.modes)
    }

    pub fn focus_changed(&self, focused: bool) -> Option<Vec<u8>> {
        input::encode_focus(focused, &self.screen.modes)
    }

    /// Encode a mouse event in viewport coordinates, or `None` when the
    /// application is not tracking mice.
    pub fn mouse(
        &self,
        button: MouseButton,
        kind: MouseEventKind,
        col: usize,
        row: usize,
        mods: Modifiers,
    ) -> Option<Vec<u8>> {
        input::encode_mouse(button, kind, col, row, mods, &self.screen.modes)
    }

    /// True when the application wants mouse input instead of the
    /// host's selection handling.
    pub fn wants_mouse(&self) -> bool {
        self.screen.modes.mouse != crate::screen::MouseMode::None
    }

    // ---- viewport scrolling ----

    pub fn scroll_display(&mut self, delta: isize) {
        self.screen.scroll_display(delta);
    }

    pub fn scroll_pages(&mut self, pages: isize) {
        self.screen.scroll_pages(pages);
    }

    pub fn scroll_to_top(&mut self) {
        self.screen.scroll_to_top();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.screen.scroll_to_bottom();
    }

    // ---- selection ----

    /// Begin a selection at a displayed cell.
    pub fn selection_start(&mut self, col: usize, row: usize, mode: SelectionMode) {
        let row = self.screen.ydisp() + row;
        self.selection.start(Position { row, col }, mode);
    }

    /// Extend the selection to a displayed cell.
    pub fn selection_update(&mut self, col: usize, row: usize) {
        let row = self.screen.ydisp() + row;
        self.selection.update(Position { row, col });
    }

    pub fn selection_clear(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self) {
        self.selection.select_all();
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_active()
    }

    /// The selection span in absolute buffer coordinates.
    pub fn selection_range(&self) -> Option<(Position, Position)> {
        self.selection.range(&self.screen)
    }

    pub fn selected_text(&self) -> Option<String> {
        self.selection.text(&self.screen)
    }

    // ---- search ----

    pub fn find(
        &self,
        pattern: &str,
        case_sensitive: bool,
        is_regex: bool,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.screen.find(pattern, case_sensitive, is_regex)
    }

    // ---- markers ----

    pub fn add_marker(&mut self, offset: isize) -> Marker {
        self.screen.add_marker(offset)
    }

    pub fn marker_row(&self, marker: Marker) -> Option<usize> {
        self.screen.marker_row(marker)
    }

    pub fn dispose_marker(&mut self, marker: Marker) {
        self.screen.dispose_marker(marker);
    }

    // ---- reset ----

    /// Full reset: parser, screen, selection and the output backlog.
    pub fn reset(&mut self) {
        self.parser = Parser::new();
        self.screen.reset();
        self.selection.clear();
        self.write_queue.clear();
        if self.paused {
            self.paused = false;
            self.screen.emit(Event::FlowControl(FlowControl::Resume));
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(TermOptions::default())
    }
}
