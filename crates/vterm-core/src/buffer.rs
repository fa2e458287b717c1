//! Row storage: a bounded circular line buffer with line markers
//!
//! [`CircularBuffer`] keeps the scrollback plus the visible rows in a
//! fixed-capacity ring. When a push or splice would exceed capacity the
//! oldest rows are dropped and the operation reports how many, so callers
//! can shift anything indexed by absolute row (viewport offsets,
//! selection anchors). Markers attached to rows are adjusted here
//! directly.
//!
//! Indices into the buffer are "absolute" rows: 0 is the oldest retained
//! row, `len() - 1` the newest.

use crate::cell::{Attr, Cell};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// One terminal row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Cell>,
    /// True when this row is the continuation of the previous row
    /// (soft wrap, not a newline).
    pub wrapped: bool,
}

impl Row {
    pub fn blank(cols: usize, attr: Attr) -> Self {
        Self {
            cells: vec![Cell::blank(attr); cols.max(1)],
            wrapped: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn get_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Blank out columns `start..end`. A wide pair straddling either
    /// edge is blanked whole so no half characters remain.
    pub fn erase(&mut self, start: usize, end: usize, attr: Attr) {
        let end = end.min(self.cells.len());
        let mut start = start.min(end);
        if start >= end {
            return;
        }
        if start > 0 && self.cells[start].is_spacer() {
            start -= 1;
        }
        let mut end = end;
        if end < self.cells.len() && self.cells[end].is_spacer() {
            end += 1;
        }
        for cell in &mut self.cells[start..end] {
            *cell = Cell::blank(attr);
        }
    }

    /// Blank the whole row.
    pub fn fill(&mut self, attr: Attr) {
        for cell in &mut self.cells {
            *cell = Cell::blank(attr);
        }
    }

    /// Insert `count` blank cells at `col`, pushing the tail off the
    /// right edge.
    pub fn insert_cells(&mut self, col: usize, count: usize, attr: Attr) {
        let cols = self.cells.len();
        if col >= cols || count == 0 {
            return;
        }
        // splitting a wide pair leaves blanks, not half a character
        if self.cells[col].is_spacer() && col > 0 {
            self.cells[col - 1] = Cell::blank(attr);
            self.cells[col] = Cell::blank(attr);
        }
        let count = count.min(cols - col);
        for _ in 0..count {
            self.cells.insert(col, Cell::blank(attr));
        }
        self.cells.truncate(cols);
        self.fix_trailing_wide(attr);
    }

    /// Delete `count` cells at `col`, filling in blanks from the right.
    pub fn delete_cells(&mut self, col: usize, count: usize, attr: Attr) {
        let cols = self.cells.len();
        if col >= cols || count == 0 {
            return;
        }
        if self.cells[col].is_spacer() && col > 0 {
            self.cells[col - 1] = Cell::blank(attr);
        }
        let count = count.min(cols - col);
        self.cells.drain(col..col + count);
        self.cells.resize(cols, Cell::blank(attr));
        // the cell pulled into `col` may be an orphaned spacer
        if self.cells[col].is_spacer() {
            self.cells[col] = Cell::blank(attr);
        }
    }

    /// Grow or shrink to `cols` columns. New cells take `attr`; a wide
    /// lead stranded on the new last column becomes a blank.
    pub fn resize(&mut self, cols: usize, attr: Attr) {
        let cols = cols.max(1);
        if cols == self.cells.len() {
            return;
        }
        if cols < self.cells.len() {
            self.cells.truncate(cols);
        } else {
            self.cells.resize(cols, Cell::blank(attr));
        }
        self.fix_trailing_wide(attr);
    }

    fn fix_trailing_wide(&mut self, attr: Attr) {
        if let Some(last) = self.cells.last_mut() {
            if last.is_wide() {
                *last = Cell::blank(attr);
            }
        }
    }

    /// Row text with combining characters, skipping wide spacers.
    pub fn text(&self, trim_right: bool) -> String {
        let mut out = String::with_capacity(self.cells.len());
        for cell in &self.cells {
            cell.append_text(&mut out);
        }
        if trim_right {
            out.truncate(out.trim_end_matches(' ').len());
        }
        out
    }

    /// Text for columns `start..end`, for selection extraction.
    pub fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.cells.len());
        let start = start.min(end);
        let mut out = String::new();
        for cell in &self.cells[start..end] {
            cell.append_text(&mut out);
        }
        out
    }

    /// Text plus, per character, the display column it starts at and
    /// the width of its cell. Combining characters report their base
    /// cell's column and width.
    pub fn text_with_columns(&self) -> (String, Vec<(usize, u8)>) {
        let mut text = String::with_capacity(self.cells.len());
        let mut columns = Vec::with_capacity(self.cells.len());
        for (col, cell) in self.cells.iter().enumerate() {
            if cell.is_spacer() {
                continue;
            }
            text.push(if cell.ch == '\u{a0}' { ' ' } else { cell.ch });
            columns.push((col, cell.width.max(1)));
            if let Some(comb) = &cell.combining {
                for c in comb.chars() {
                    text.push(c);
                    columns.push((col, cell.width.max(1)));
                }
            }
        }
        (text, columns)
    }
}

impl Index<usize> for Row {
    type Output = Cell;

    fn index(&self, col: usize) -> &Cell {
        &self.cells[col]
    }
}

impl IndexMut<usize> for Row {
    fn index_mut(&mut self, col: usize) -> &mut Cell {
        &mut self.cells[col]
    }
}

/// Handle for a line marker. Stays valid as the buffer trims; resolves
/// to `None` once its row has been trimmed away or the marker disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker(u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkerEntry {
    id: u32,
    row: usize,
}

/// Fixed-capacity ring of rows (generic to keep the ring logic testable
/// on plain values).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircularBuffer<T> {
    array: Vec<Option<T>>,
    start_index: usize,
    length: usize,
    markers: Vec<MarkerEntry>,
    next_marker_id: u32,
}

impl<T> CircularBuffer<T> {
    pub fn new(max_length: usize) -> Self {
        let max_length = max_length.max(1);
        Self {
            array: (0..max_length).map(|_| None).collect(),
            start_index: 0,
            length: 0,
            markers: Vec::new(),
            next_marker_id: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.array.len()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_full(&self) -> bool {
        self.length == self.max_length()
    }

    fn cyclic(&self, index: usize) -> usize {
        (self.start_index + index) % self.array.len()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.length {
            self.array[self.cyclic(index)].as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.length {
            let i = self.cyclic(index);
            self.array[i].as_mut()
        } else {
            None
        }
    }

    /// Replace the element at `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, value: T) {
        if index < self.length {
            let i = self.cyclic(index);
            self.array[i] = Some(value);
        }
    }

    /// Append an element. Returns the number of rows trimmed from the
    /// start to make room (0 or 1).
    pub fn push(&mut self, value: T) -> usize {
        if self.length == self.max_length() {
            // overwrite the oldest slot and rotate
            self.array[self.start_index] = Some(value);
            self.start_index = (self.start_index + 1) % self.max_length();
            self.adjust_markers_trim(1);
            1
        } else {
            let i = self.cyclic(self.length);
            self.array[i] = Some(value);
            self.length += 1;
            0
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.length == 0 {
            return None;
        }
        self.length -= 1;
        let len = self.length;
        self.markers.retain(|m| m.row < len);
        let i = self.cyclic(self.length);
        self.array[i].take()
    }

    /// Remove `delete_count` elements at `start`, then insert `items`
    /// there. Returns the number of elements trimmed from the start when
    /// the insert overflows capacity. Out-of-range arguments clamp.
    pub fn splice(&mut self, start: usize, delete_count: usize, items: Vec<T>) -> usize {
        let start = start.min(self.length);
        let delete_count = delete_count.min(self.length - start);

        if delete_count > 0 {
            for i in start..self.length - delete_count {
                let src = self.cyclic(i + delete_count);
                let v = self.array[src].take();
                let dest = self.cyclic(i);
                self.array[dest] = v;
            }
            for i in self.length - delete_count..self.length {
                let dest = self.cyclic(i);
                self.array[dest] = None;
            }
            self.length -= delete_count;
            self.adjust_markers_delete(start, delete_count);
        }

        if items.is_empty() {
            return 0;
        }

        let mut start = start;
        let mut items = items;
        let overflow = (self.length + items.len()).saturating_sub(self.max_length());
        if overflow > 0 {
            // Keep only the newest max_length elements of the combined
            // sequence: drop existing rows from the front first, then
            // leading items if the insert point itself is at the front.
            let drop_existing = overflow.min(start);
            if drop_existing > 0 {
                self.trim_start(drop_existing);
                start -= drop_existing;
            }
            let drop_items = overflow - drop_existing;
            if drop_items > 0 {
                items.drain(..drop_items.min(items.len()));
            }
        }

        let count = items.len();
        if count > 0 {
            for i in (start..self.length).rev() {
                let src = self.cyclic(i);
                let v = self.array[src].take();
                let dest = self.cyclic(i + count);
                self.array[dest] = v;
            }
            for (i, item) in items.into_iter().enumerate() {
                let dest = self.cyclic(start + i);
                self.array[dest] = Some(item);
            }
            self.length += count;
            self.adjust_markers_insert(start, count);
        }
        overflow
    }

    /// Drop the oldest `count` elements.
    pub fn trim_start(&mut self, count: usize) {
        let count = count.min(self.length);
        if count == 0 {
            return;
        }
        for i in 0..count {
            let dest = self.cyclic(i);
            self.array[dest] = None;
        }
        self.start_index = (self.start_index + count) % self.max_length();
        self.length -= count;
        self.adjust_markers_trim(count);
    }

    /// Copy `count` elements starting at `start` to `start + offset`,
    /// extending the buffer when shifting past the end. Shifts that
    /// would move elements out of range clamp to a no-op.
    pub fn shift_elements(&mut self, start: usize, count: usize, offset: isize)
    where
        T: Clone,
    {
        if count == 0 || offset == 0 || start >= self.length {
            return;
        }
        let count = count.min(self.length - start);
        if offset > 0 {
            let offset = offset as usize;
            if start + count + offset > self.max_length() {
                return;
            }
            for i in (0..count).rev() {
                let v = self.array[self.cyclic(start + i)].clone();
                let dest = self.cyclic(start + i + offset);
                self.array[dest] = v;
            }
            if start + count + offset > self.length {
                self.length = start + count + offset;
            }
        } else {
            let offset = (-offset) as usize;
            if offset > start {
                return;
            }
            for i in 0..count {
                let v = self.array[self.cyclic(start + i)].clone();
                let dest = self.cyclic(start + i - offset);
                self.array[dest] = v;
            }
        }
    }

    /// Change capacity. Shrinking drops the oldest rows first; the
    /// retained rows are rebased so absolute indices stay contiguous.
    /// Returns the number of rows dropped.
    pub fn set_max_length(&mut self, new_max: usize) -> usize {
        let new_max = new_max.max(1);
        if new_max == self.max_length() {
            return 0;
        }
        let trimmed = self.length.saturating_sub(new_max);
        if trimmed > 0 {
            self.trim_start(trimmed);
        }
        let mut fresh: Vec<Option<T>> = (0..new_max).map(|_| None).collect();
        for (i, slot) in fresh.iter_mut().enumerate().take(self.length) {
            let src = self.cyclic(i);
            *slot = self.array[src].take();
        }
        self.array = fresh;
        self.start_index = 0;
        trimmed
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.length).filter_map(move |i| self.array[self.cyclic(i)].as_ref())
    }

    /// Attach a marker to the row at `index` (clamped to the newest row).
    pub fn add_marker(&mut self, index: usize) -> Marker {
        let row = index.min(self.length.saturating_sub(1));
        let id = self.next_marker_id;
        self.next_marker_id = self.next_marker_id.wrapping_add(1);
        self.markers.push(MarkerEntry { id, row });
        Marker(id)
    }

    /// Current absolute row of a marker, or `None` if it was disposed or
    /// its row trimmed away.
    pub fn marker_row(&self, marker: Marker) -> Option<usize> {
        self.markers.iter().find(|m| m.id == marker.0).map(|m| m.row)
    }

    pub fn dispose_marker(&mut self, marker: Marker) {
        self.markers.retain(|m| m.id != marker.0);
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    fn adjust_markers_trim(&mut self, count: usize) {
        self.markers.retain_mut(|m| {
            if m.row < count {
                false
            } else {
                m.row -= count;
                true
            }
        });
    }

    fn adjust_markers_delete(&mut self, start: usize, count: usize) {
        self.markers.retain_mut(|m| {
            if m.row < start {
                true
            } else if m.row < start + count {
                false
            } else {
                m.row -= count;
                true
            }
        });
    }

    fn adjust_markers_insert(&mut self, start: usize, count: usize) {
        for m in &mut self.markers {
            if m.row >= start {
                m.row += count;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(max: usize, values: &[i32]) -> CircularBuffer<i32> {
        let mut buf = CircularBuffer::new(max);
        for &v in values {
            buf.push(v);
        }
        buf
    }

    fn contents(buf: &CircularBuffer<i32>) -> Vec<i32> {
        buf.iter().copied().collect()
    }

    #[test]
    fn test_push_and_get() {
        let buf = filled(5, &[1, 2, 3]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.get(0), Some(&1));
        assert_eq!(buf.get(2), Some(&3));
        assert_eq!(buf.get(3), None);
    }

    #[test]
    fn test_push_beyond_capacity_trims_oldest() {
        let mut buf = filled(3, &[1, 2, 3]);
        assert_eq!(buf.push(4), 1);
        assert_eq!(buf.push(5), 1);
        assert_eq!(buf.len(), 3);
        assert_eq!(contents(&buf), vec![3, 4, 5]);
    }

    #[test]
    fn test_pop() {
        let mut buf = filled(3, &[1, 2, 3]);
        assert_eq!(buf.pop(), Some(3));
        assert_eq!(buf.len(), 2);
        buf.push(9);
        assert_eq!(contents(&buf), vec![1, 2, 9]);
    }

    #[test]
    fn test_splice_delete() {
        let mut buf = filled(5, &[1, 2, 3, 4, 5]);
        let trimmed = buf.splice(1, 2, Vec::new());
        assert_eq!(trimmed, 0);
        assert_eq!(contents(&buf), vec![1, 4, 5]);
    }

    #[test]
    fn test_splice_insert() {
        let mut buf = filled(10, &[1, 2, 3]);
        let trimmed = buf.splice(1, 0, vec![8, 9]);
        assert_eq!(trimmed, 0);
        assert_eq!(contents(&buf), vec![1, 8, 9, 2, 3]);
    }

    #[test]
    fn test_splice_replace() {
        let mut buf = filled(10, &[1, 2, 3, 4]);
        buf.splice(1, 2, vec![7]);
        assert_eq!(contents(&buf), vec![1, 7, 4]);
    }

    #[test]
    fn test_splice_insert_overflow_reports_trim() {
        let mut buf = filled(4, &[1, 2, 3, 4]);
        let trimmed = buf.splice(3, 0, vec![9]);
        assert_eq!(trimmed, 1);
        assert_eq!(contents(&buf), vec![2, 3, 9, 4]);
    }

    #[test]
    fn test_splice_overflow_at_front_drops_items() {
        // inserting at the very front of a full ring: the inserted run
        // is the oldest part of the combined sequence, so it is what
        // gets dropped
        let mut buf = filled(3, &[1, 2, 3]);
        let trimmed = buf.splice(0, 0, vec![7, 8]);
        assert_eq!(trimmed, 2);
        assert_eq!(contents(&buf), vec![1, 2, 3]);
    }

    #[test]
    fn test_splice_after_wrap() {
        let mut buf = filled(3, &[1, 2, 3, 4, 5]); // holds 3,4,5 wrapped
        buf.splice(1, 1, vec![9]);
        assert_eq!(contents(&buf), vec![3, 9, 5]);
    }

    #[test]
    fn test_trim_start() {
        let mut buf = filled(5, &[1, 2, 3, 4]);
        buf.trim_start(2);
        assert_eq!(contents(&buf), vec![3, 4]);
        buf.trim_start(10);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_shift_elements_forward() {
        let mut buf = filled(10, &[1, 2, 3, 4, 5]);
        buf.shift_elements(0, 3, 2);
        assert_eq!(contents(&buf), vec![1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_shift_elements_backward() {
        let mut buf = filled(10, &[1, 2, 3, 4, 5]);
        buf.shift_elements(3, 2, -2);
        assert_eq!(contents(&buf), vec![1, 4, 5, 4, 5]);
    }

    #[test]
    fn test_shift_elements_extends_length() {
        let mut buf = filled(10, &[1, 2, 3]);
        buf.shift_elements(1, 2, 3);
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.get(4), Some(&2));
        assert_eq!(buf.get(5), Some(&3));
    }

    #[test]
    fn test_set_max_length_grow_preserves_order() {
        let mut buf = filled(3, &[1, 2, 3, 4, 5]); // wrapped: 3,4,5
        let trimmed = buf.set_max_length(6);
        assert_eq!(trimmed, 0);
        assert_eq!(contents(&buf), vec![3, 4, 5]);
        buf.push(6);
        assert_eq!(contents(&buf), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_set_max_length_shrink_trims_oldest() {
        let mut buf = filled(5, &[1, 2, 3, 4, 5]);
        let trimmed = buf.set_max_length(2);
        assert_eq!(trimmed, 3);
        assert_eq!(contents(&buf), vec![4, 5]);
    }

    #[test]
    fn test_marker_follows_trim() {
        let mut buf = filled(3, &[1, 2, 3]);
        let early = buf.add_marker(0);
        let late = buf.add_marker(2);
        buf.push(4); // trims row 0
        assert_eq!(buf.marker_row(early), None);
        assert_eq!(buf.marker_row(late), Some(1));
    }

    #[test]
    fn test_marker_follows_splice() {
        let mut buf = filled(10, &[1, 2, 3, 4, 5]);
        let m = buf.add_marker(3);
        buf.splice(1, 0, vec![9]);
        assert_eq!(buf.marker_row(m), Some(4));
        buf.splice(0, 2, Vec::new());
        assert_eq!(buf.marker_row(m), Some(2));
    }

    #[test]
    fn test_marker_on_deleted_row_is_disposed() {
        let mut buf = filled(10, &[1, 2, 3]);
        let m = buf.add_marker(1);
        buf.splice(1, 1, Vec::new());
        assert_eq!(buf.marker_row(m), None);
    }

    #[test]
    fn test_marker_on_popped_row_is_disposed() {
        let mut buf = filled(10, &[1, 2, 3]);
        let kept = buf.add_marker(1);
        let gone = buf.add_marker(2);
        assert_eq!(buf.pop(), Some(3));
        assert_eq!(buf.marker_row(gone), None);
        assert_eq!(buf.marker_row(kept), Some(1));
        // a later push reuses the slot without reviving the marker
        buf.push(9);
        assert_eq!(buf.marker_row(gone), None);
    }

    #[test]
    fn test_dispose_marker() {
        let mut buf = filled(5, &[1, 2, 3]);
        let m = buf.add_marker(1);
        buf.dispose_marker(m);
        assert_eq!(buf.marker_row(m), None);
        assert_eq!(buf.marker_count(), 0);
    }

    #[test]
    fn test_buffer_snapshot_round_trip() {
        let mut styled = Attr::default();
        styled.set_fg(Some(1));
        let mut row = Row::blank(5, Attr::default());
        row[0] = Cell::new('日', 2, styled);
        row[1] = Cell::wide_spacer(styled);
        row[2] = Cell::new('e', 1, Attr::default());
        row[2].push_combining('\u{0301}');
        row.wrapped = true;

        let mut buf: CircularBuffer<Row> = CircularBuffer::new(4);
        buf.push(row);
        buf.push(Row::blank(5, Attr::default()));
        let marker = buf.add_marker(0);

        let snapshot = serde_json::to_string(&buf).unwrap();
        let restored: CircularBuffer<Row> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(restored.len(), 2);
        let first = restored.get(0).unwrap();
        assert_eq!(first.text(true), "日e\u{0301}");
        assert!(first.wrapped);
        assert_eq!(first[0].attr, styled);
        assert!(first[0].is_wide());
        assert_eq!(restored.marker_row(marker), Some(0));
    }

    #[test]
    fn test_row_erase_keeps_wide_pairs_whole() {
        let attr = Attr::default();
        let mut row = Row::blank(6, attr);
        row[0] = Cell::new('日', 2, attr);
        row[1] = Cell::wide_spacer(attr);
        row[2] = Cell::new('本', 2, attr);
        row[3] = Cell::wide_spacer(attr);
        // start lands on the spacer of 日, end on the spacer of 本
        row.erase(1, 3, attr);
        assert_eq!(row[0].ch, ' ');
        assert_eq!(row[2].ch, ' ');
        assert!(!row[3].is_spacer());
    }

    #[test]
    fn test_row_resize_blanks_stranded_wide() {
        let attr = Attr::default();
        let mut row = Row::blank(4, attr);
        row[2] = Cell::new('日', 2, attr);
        row[3] = Cell::wide_spacer(attr);
        row.resize(3, attr);
        assert_eq!(row.len(), 3);
        assert!(!row[2].is_wide());
        assert_eq!(row[2].ch, ' ');
    }

    #[test]
    fn test_row_insert_delete_cells() {
        let attr = Attr::default();
        let mut row = Row::blank(5, attr);
        for (i, c) in ['a', 'b', 'c', 'd', 'e'].iter().enumerate() {
            row[i] = Cell::new(*c, 1, attr);
        }
        row.insert_cells(1, 2, attr);
        assert_eq!(row.text(false), "a  bc");
        assert_eq!(row.len(), 5);

        row.delete_cells(1, 2, attr);
        assert_eq!(row.text(true), "abc");
        assert_eq!(row.len(), 5);
    }

    #[test]
    fn test_row_text_with_columns() {
        let attr = Attr::default();
        let mut row = Row::blank(6, attr);
        row[0] = Cell::new('日', 2, attr);
        row[1] = Cell::wide_spacer(attr);
        row[2] = Cell::new('a', 1, attr);
        let mut e = Cell::new('e', 1, attr);
        e.push_combining('\u{0301}');
        row[3] = e;
        let (text, columns) = row.text_with_columns();
        assert_eq!(text, "日ae\u{0301}  ");
        // 日 starts at col 0 width 2, a at col 2, e and its accent at col 3
        assert_eq!(columns[0], (0, 2));
        assert_eq!(columns[1], (2, 1));
        assert_eq!(columns[2], (3, 1));
        assert_eq!(columns[3], (3, 1));
    }
}
