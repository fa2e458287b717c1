//! Text selection
//!
//! Tracks a selection over the screen buffer in absolute row
//! coordinates, so scrollback trimming can shift or invalidate it.
//! Word and line modes snap both endpoints to their enclosing unit;
//! snapping is recomputed from the live buffer, so a selection follows
//! content edits underneath it.

use crate::cell::Cell;
use crate::screen::Screen;

/// Characters that bound a word without being whitespace.
const WORD_SEPARATORS: &str = "()[]{}|'\"`,;";

/// A buffer position: absolute row, display column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Cell,
    Word,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellClass {
    Word,
    Whitespace,
    Separator,
}

fn classify(cell: &Cell) -> CellClass {
    if cell.is_spacer() {
        // spacers belong to their wide lead, which is always a word char
        return CellClass::Word;
    }
    if matches!(cell.ch, ' ' | '\u{a0}') {
        CellClass::Whitespace
    } else if WORD_SEPARATORS.contains(cell.ch) {
        CellClass::Separator
    } else {
        CellClass::Word
    }
}

/// An active or empty selection over the buffer.
#[derive(Debug, Default)]
pub struct Selection {
    anchor: Option<Position>,
    extent: Option<Position>,
    mode: SelectionMode,
    select_all: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a selection at `pos`.
    pub fn start(&mut self, pos: Position, mode: SelectionMode) {
        self.anchor = Some(pos);
        self.extent = Some(pos);
        self.mode = mode;
        self.select_all = false;
    }

    /// Extend the selection to `pos`.
    pub fn update(&mut self, pos: Position) {
        if self.anchor.is_some() {
            self.extent = Some(pos);
        }
    }

    pub fn select_all(&mut self) {
        self.anchor = None;
        self.extent = None;
        self.select_all = true;
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.extent = None;
        self.select_all = false;
    }

    pub fn is_active(&self) -> bool {
        self.select_all || self.anchor.is_some()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Shift the selection up after `count` rows were trimmed from the
    /// buffer. A selection whose rows were trimmed away is cleared.
    pub fn on_trim(&mut self, count: usize) {
        if count == 0 || self.select_all {
            return;
        }
        let (Some(anchor), Some(extent)) = (self.anchor, self.extent) else {
            return;
        };
        if anchor.row < count || extent.row < count {
            self.clear();
            return;
        }
        self.anchor = Some(Position {
            row: anchor.row - count,
            col: anchor.col,
        });
        self.extent = Some(Position {
            row: extent.row - count,
            col: extent.col,
        });
    }

    /// The normalized selection span: start position and end position
    /// with an exclusive end column.
    pub fn range(&self, screen: &Screen) -> Option<(Position, Position)> {
        if self.select_all {
            let last = screen.total_rows().checked_sub(1)?;
            return Some((
                Position { row: 0, col: 0 },
                Position {
                    row: last,
                    col: screen.cols(),
                },
            ));
        }
        let anchor = self.anchor?;
        let extent = self.extent?;
        let (first, second) = if extent < anchor {
            (extent, anchor)
        } else {
            (anchor, extent)
        };
        let start = Position {
            row: first.row,
            col: self.snap_start(screen, first),
        };
        let end = Position {
            row: second.row,
            col: self.snap_end(screen, second),
        };
        if start.row == end.row && start.col >= end.col {
            return None;
        }
        Some((start, end))
    }

    /// The selected text, joining rows with newlines except across soft
    /// wraps.
    pub fn text(&self, screen: &Screen) -> Option<String> {
        let (start, end) = self.range(screen)?;
        let cols = screen.cols();
        let mut out = String::new();
        for row_idx in start.row..=end.row {
            let Some(row) = screen.line(row_idx) else {
                continue;
            };
            let from = if row_idx == start.row { start.col } else { 0 };
            let to = if row_idx == end.row { end.col } else { cols };
            let mut segment = row.text_range(from, to);
            let continues = row_idx < end.row
                && screen
                    .line(row_idx + 1)
                    .map(|next| next.wrapped)
                    .unwrap_or(false);
            if to >= cols && !continues {
                segment.truncate(segment.trim_end_matches(' ').len());
            }
            out.push_str(&segment);
            if row_idx < end.row && !continues {
                out.push('\n');
            }
        }
        Some(out)
    }

    fn snap_start(&self, screen: &Screen, pos: Position) -> usize {
        match self.mode {
            SelectionMode::Cell => match screen.line(pos.row).and_then(|row| row.get(pos.col)) {
                // a click on the spacer half selects the whole pair
                Some(cell) if cell.is_spacer() && pos.col > 0 => pos.col - 1,
                _ => pos.col,
            },
            SelectionMode::Word => self
                .word_span(screen, pos)
                .map(|(start, _)| start)
                .unwrap_or(pos.col),
            SelectionMode::Line => 0,
        }
    }

    fn snap_end(&self, screen: &Screen, pos: Position) -> usize {
        let cols = screen.cols();
        match self.mode {
            SelectionMode::Cell => {
                match screen.line(pos.row).and_then(|row| row.get(pos.col)) {
                    // a click on the lead half selects the whole pair
                    Some(cell) if cell.is_wide() => (pos.col + 2).min(cols),
                    _ => (pos.col + 1).min(cols),
                }
            }
            SelectionMode::Word => self
                .word_span(screen, pos)
                .map(|(_, end)| end)
                .unwrap_or_else(|| (pos.col + 1).min(cols)),
            SelectionMode::Line => cols,
        }
    }

    /// The run of same-class cells around `pos`, as (start, exclusive
    /// end). Separators select just themselves.
    fn word_span(&self, screen: &Screen, pos: Position) -> Option<(usize, usize)> {
        let row = screen.line(pos.row)?;
        let mut col = pos.col.min(row.len().checked_sub(1)?);
        // resolve a spacer to its lead before classifying
        if row.get(col).is_some_and(|cell| cell.is_spacer()) && col > 0 {
            col -= 1;
        }
        let class = classify(row.get(col)?);
        if class == CellClass::Separator {
            return Some((col, col + 1));
        }
        let mut start = col;
        while start > 0 && classify(&row[start - 1]) == class {
            start -= 1;
        }
        let mut end = col + 1;
        while end < row.len() && classify(&row[end]) == class {
            end += 1;
        }
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::ScreenConfig;

    fn screen_with(cols: usize, rows: usize, text: &str) -> Screen {
        let mut screen = Screen::new(cols, rows, ScreenConfig::default());
        for c in text.chars() {
            match c {
                '\n' => {
                    screen.linefeed();
                    screen.carriage_return();
                }
                c => screen.put_char(c),
            }
        }
        screen
    }

    fn pos(row: usize, col: usize) -> Position {
        Position { row, col }
    }

    #[test]
    fn test_cell_selection() {
        let screen = screen_with(20, 5, "hello world");
        let mut sel = Selection::new();
        sel.start(pos(0, 0), SelectionMode::Cell);
        sel.update(pos(0, 4));
        assert_eq!(sel.text(&screen).unwrap(), "hello");
    }

    #[test]
    fn test_reversed_drag() {
        let screen = screen_with(20, 5, "hello world");
        let mut sel = Selection::new();
        sel.start(pos(0, 6), SelectionMode::Cell);
        sel.update(pos(0, 1));
        assert_eq!(sel.text(&screen).unwrap(), "ello w");
    }

    #[test]
    fn test_single_click_selects_one_cell() {
        let screen = screen_with(20, 5, "abc");
        let mut sel = Selection::new();
        sel.start(pos(0, 1), SelectionMode::Cell);
        assert_eq!(sel.text(&screen).unwrap(), "b");
    }

    #[test]
    fn test_word_selection() {
        let screen = screen_with(20, 5, "foo bar(baz)");
        let mut sel = Selection::new();
        sel.start(pos(0, 5), SelectionMode::Word);
        assert_eq!(sel.text(&screen).unwrap(), "bar");

        sel.start(pos(0, 7), SelectionMode::Word);
        assert_eq!(sel.text(&screen).unwrap(), "(");

        // whitespace run selects the gap
        sel.start(pos(0, 3), SelectionMode::Word);
        assert_eq!(sel.text(&screen).unwrap(), " ");
    }

    #[test]
    fn test_word_selection_stops_at_nbsp() {
        let screen = screen_with(20, 5, "no\u{a0}break here");
        let mut sel = Selection::new();
        sel.start(pos(0, 1), SelectionMode::Word);
        assert_eq!(sel.text(&screen).unwrap(), "no");

        // a no-break space is a gap like any other blank
        sel.start(pos(0, 2), SelectionMode::Word);
        assert_eq!(sel.text(&screen).unwrap(), " ");

        sel.start(pos(0, 3), SelectionMode::Word);
        assert_eq!(sel.text(&screen).unwrap(), "break");
    }

    #[test]
    fn test_word_drag_spans_both_words() {
        let screen = screen_with(20, 5, "foo bar");
        let mut sel = Selection::new();
        sel.start(pos(0, 1), SelectionMode::Word);
        sel.update(pos(0, 5));
        assert_eq!(sel.text(&screen).unwrap(), "foo bar");
    }

    #[test]
    fn test_word_selection_wide_chars() {
        let screen = screen_with(20, 5, "日本語 x");
        let mut sel = Selection::new();
        sel.start(pos(0, 2), SelectionMode::Word);
        assert_eq!(sel.text(&screen).unwrap(), "日本語");
    }

    #[test]
    fn test_cell_selection_snaps_wide_pair() {
        let screen = screen_with(20, 5, "日x");
        let mut sel = Selection::new();
        // click on the spacer half
        sel.start(pos(0, 1), SelectionMode::Cell);
        assert_eq!(sel.text(&screen).unwrap(), "日");
        // click on the lead half
        sel.start(pos(0, 0), SelectionMode::Cell);
        assert_eq!(sel.text(&screen).unwrap(), "日");
    }

    #[test]
    fn test_line_selection() {
        let screen = screen_with(20, 5, "some text\nmore");
        let mut sel = Selection::new();
        sel.start(pos(0, 4), SelectionMode::Line);
        assert_eq!(sel.text(&screen).unwrap(), "some text");
    }

    #[test]
    fn test_multi_row_joins_with_newline() {
        let screen = screen_with(20, 5, "first\nsecond");
        let mut sel = Selection::new();
        sel.start(pos(0, 0), SelectionMode::Cell);
        sel.update(pos(1, 5));
        assert_eq!(sel.text(&screen).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_wrapped_rows_join_without_newline() {
        let screen = screen_with(5, 5, "abcdefgh");
        assert!(screen.line(1).unwrap().wrapped);
        let mut sel = Selection::new();
        sel.start(pos(0, 0), SelectionMode::Cell);
        sel.update(pos(1, 2));
        assert_eq!(sel.text(&screen).unwrap(), "abcdefgh");
    }

    #[test]
    fn test_select_all() {
        let screen = screen_with(10, 3, "a\nb");
        let mut sel = Selection::new();
        sel.select_all();
        assert!(sel.is_active());
        assert_eq!(sel.text(&screen).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_trim_shifts_selection() {
        let screen = screen_with(10, 3, "a\nb\nc");
        let mut sel = Selection::new();
        sel.start(pos(2, 0), SelectionMode::Cell);
        sel.on_trim(1);
        assert_eq!(sel.text(&screen).unwrap(), "b");
    }

    #[test]
    fn test_trim_past_selection_clears_it() {
        let mut sel = Selection::new();
        sel.start(pos(1, 0), SelectionMode::Cell);
        sel.update(pos(2, 4));
        sel.on_trim(2);
        assert!(!sel.is_active());
    }

    #[test]
    fn test_clear() {
        let mut sel = Selection::new();
        sel.start(pos(0, 0), SelectionMode::Cell);
        assert!(sel.is_active());
        sel.clear();
        assert!(!sel.is_active());
        let screen = screen_with(10, 3, "x");
        assert!(sel.text(&screen).is_none());
    }
}
