// Licensed under the Apache License, Version 2.0. See LICENSE.

//! `EditBuffer`: a mutable text document built atop `TextBuffer`
//! providing grapheme-aware cursor motion, edits, undo/redo, and event emission.

pub mod cursor;
pub mod events;
pub mod undo;

use std::time::Duration;

use crate::coords::Row;
use crate::error::{CoreError, CoreResult};
use crate::text_buffer::TextBuffer;
use crate::width::WidthPolicy;

pub use cursor::CursorPos;
pub use events::EditEvent;
pub use undo::EditKind;

use cursor::{byte_offset_to_char_offset, char_offset_to_byte_offset, line_text_of, move_left, move_right, resolve_cursor, resolve_cursor_from_byte_offset};
use events::EventQueue;
use undo::UndoJournal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Live,
    Destroyed,
}

/// Mutable text document: cursor, edit operations, grapheme-aware navigation, and an
/// undo journal over a [`TextBuffer`].
pub struct EditBuffer {
    text: TextBuffer,
    cursor: CursorPos,
    /// "Sticky" target column for vertical motion, reset on any
    /// horizontal move or edit.
    sticky_col: Option<usize>,
    history: UndoJournal,
    events: EventQueue,
    lifecycle: Lifecycle,
}

impl EditBuffer {
    #[must_use]
    pub fn new(width_policy: WidthPolicy, coalesce_timeout: Duration) -> Self {
        Self {
            text: TextBuffer::new(width_policy),
            cursor: CursorPos::zero(),
            sticky_col: None,
            history: UndoJournal::new(coalesce_timeout),
            events: EventQueue::new(),
            lifecycle: Lifecycle::Live,
        }
    }

    fn check_live(&self) -> CoreResult<()> {
        if self.lifecycle == Lifecycle::Destroyed { Err(CoreError::Destroyed) } else { Ok(()) }
    }

    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.text.destroy();
        self.events.destroy();
        self.lifecycle = Lifecycle::Destroyed;
    }

    #[must_use]
    pub fn text_buffer(&self) -> &TextBuffer {
        &self.text
    }

    fn full_text(&self) -> String {
        self.text.get_plain_text(None)
    }

    fn emit_change(&mut self) {
        self.events.emit(EditEvent::ContentChanged);
        self.events.emit(EditEvent::CursorChanged);
    }

    /// Drains queued events.
    pub fn drain_events(&mut self) -> Vec<EditEvent> {
        self.events.drain()
    }

    #[must_use]
    pub fn get_text(&self) -> String {
        self.full_text()
    }

    #[must_use]
    pub fn get_cursor_position(&self) -> CursorPos {
        self.cursor
    }

    fn set_cursor_pos(&mut self, cursor: CursorPos, reset_sticky: bool) {
        self.cursor = cursor;
        if reset_sticky {
            self.sticky_col = None;
        }
        self.events.emit(EditEvent::CursorChanged);
    }

    // ---- set_text family ----------------------------------------------------

    pub fn set_text(&mut self, text: &str) -> CoreResult<()> {
        self.check_live()?;
        self.text.set_text(text.as_bytes(), true)?;
        self.history.clear();
        self.cursor = CursorPos::zero();
        self.sticky_col = None;
        self.emit_change();
        Ok(())
    }

    pub fn set_text_owned(&mut self, text: String) -> CoreResult<()> {
        self.set_text(&text)
    }

    /// `replace_text`: preserves history, pushes an `undo_replace` entry.
    pub fn replace_text(&mut self, text: &str) -> CoreResult<()> {
        self.check_live()?;
        let before = self.full_text();
        let before_cursor = self.cursor;
        self.text.set_text(text.as_bytes(), false)?;
        let after_cursor = resolve_cursor_from_byte_offset(self.text.rope(), usize::MAX);
        self.cursor = after_cursor;
        self.sticky_col = None;
        let char_len = before.chars().count().max(text.chars().count());
        self.history.push_replace(0..char_len, before, text.to_string(), before_cursor, after_cursor);
        self.emit_change();
        Ok(())
    }

    pub fn replace_text_owned(&mut self, text: String) -> CoreResult<()> {
        self.replace_text(&text)
    }

    // ---- edits ----------------------------------------------------------------

    fn record_edit(&mut self, kind: EditKind, char_range: std::ops::Range<usize>, before: String, after: String, cursor_before: CursorPos, cursor_after: CursorPos) {
        self.history.push(kind, char_range, before, after, cursor_before, cursor_after);
    }

    /// Inserts `s` at the cursor. `\n` splits the current line; multi-line inserts
    /// place the cursor at the end of the last inserted line.
    pub fn insert_text(&mut self, s: &str) -> CoreResult<()> {
        self.check_live()?;
        if s.is_empty() {
            return Ok(());
        }
        let before = self.full_text();
        let cursor_before = self.cursor;
        let char_off = byte_offset_to_char_offset(&before, cursor_before.offset);
        self.text.splice_raw(char_off..char_off, s.as_bytes())?;
        let after = self.full_text();
        let inserted_chars = s.replace("\r\n", "\n").chars().count();
        let new_char_off = char_off + inserted_chars;
        let cursor_after = resolve_cursor_from_byte_offset(self.text.rope(), char_offset_to_byte_offset(&after, new_char_off));
        self.cursor = cursor_after;
        self.sticky_col = None;
        self.record_edit(EditKind::Insert, char_off..new_char_off, before, after, cursor_before, cursor_after);
        self.emit_change();
        Ok(())
    }

    pub fn insert_char(&mut self, s: &str) -> CoreResult<()> {
        self.insert_text(s)
    }

    /// `delete_char`: at end-of-line, merges with the next line.
    pub fn delete_char(&mut self) -> CoreResult<()> {
        self.check_live()?;
        let before = self.full_text();
        let char_off = byte_offset_to_char_offset(&before, self.cursor.offset);
        if char_off >= before.chars().count() {
            return Ok(());
        }
        self.delete_char_range(char_off, char_off + 1)
    }

    /// `delete_char_backward`: at `(row, 0)`, merges with the previous line.
    pub fn delete_char_backward(&mut self) -> CoreResult<()> {
        self.check_live()?;
        let before = self.full_text();
        let char_off = byte_offset_to_char_offset(&before, self.cursor.offset);
        if char_off == 0 {
            return Ok(());
        }
        self.delete_char_range(char_off - 1, char_off)
    }

    fn delete_char_range(&mut self, start_char: usize, end_char: usize) -> CoreResult<()> {
        let before = self.full_text();
        let cursor_before = self.cursor;
        self.text.splice_raw(start_char..end_char, b"")?;
        let after = self.full_text();
        let cursor_after = resolve_cursor_from_byte_offset(self.text.rope(), char_offset_to_byte_offset(&after, start_char));
        self.cursor = cursor_after;
        self.sticky_col = None;
        self.record_edit(EditKind::Delete, start_char..end_char, before, after, cursor_before, cursor_after);
        self.emit_change();
        Ok(())
    }

    /// `delete_range(sr,sc,er,ec)`: reversed coordinate pairs are silently
    /// swapped.
    pub fn delete_range(&mut self, start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> CoreResult<()> {
        self.check_live()?;
        let rope = self.text.rope();
        let a = rope.position_to_offset(Row(start_row), start_col).as_usize();
        let b = rope.position_to_offset(Row(end_row), end_col).as_usize();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.delete_char_range(lo, hi)
    }

    /// `new_line`: inserts `\n` at the cursor.
    pub fn new_line(&mut self) -> CoreResult<()> {
        self.insert_text("\n")
    }

    /// Deletes the entire line the cursor is on, including its trailing newline.
    pub fn delete_line(&mut self) -> CoreResult<()> {
        self.check_live()?;
        let row = self.cursor.row;
        let rope = self.text.rope();
        let start = rope.line_start_offset(row).as_usize();
        let line_len = line_text_of(rope, row).chars().count();
        let text_char_len = rope.len_chars();
        let mut end = (start + line_len).min(text_char_len);
        if end < text_char_len {
            end += 1; // swallow the trailing '\n' too
        }
        self.delete_char_range(start, end)
    }

    // ---- cursor motion ----------------------------------------------------------

    pub fn move_cursor_right(&mut self) -> CoreResult<()> {
        self.check_live()?;
        let next = move_right(self.text.rope(), self.text.width_policy(), self.cursor);
        self.set_cursor_pos(next, true);
        Ok(())
    }

    pub fn move_cursor_left(&mut self) -> CoreResult<()> {
        self.check_live()?;
        let next = move_left(self.text.rope(), self.text.width_policy(), self.cursor);
        self.set_cursor_pos(next, true);
        Ok(())
    }

    pub fn move_cursor_up(&mut self) -> CoreResult<()> {
        self.check_live()?;
        if self.cursor.row.as_usize() == 0 {
            return Ok(());
        }
        let target_col = *self.sticky_col.get_or_insert(self.cursor.col);
        let next = resolve_cursor(self.text.rope(), Row(self.cursor.row.as_usize() - 1), target_col);
        self.cursor = next;
        self.events.emit(EditEvent::CursorChanged);
        Ok(())
    }

    pub fn move_cursor_down(&mut self) -> CoreResult<()> {
        self.check_live()?;
        let last_row = self.text.rope().line_count() - 1;
        if self.cursor.row.as_usize() >= last_row {
            return Ok(());
        }
        let target_col = *self.sticky_col.get_or_insert(self.cursor.col);
        let next = resolve_cursor(self.text.rope(), Row(self.cursor.row.as_usize() + 1), target_col);
        self.cursor = next;
        self.events.emit(EditEvent::CursorChanged);
        Ok(())
    }

    pub fn goto_line(&mut self, n: usize) -> CoreResult<()> {
        self.check_live()?;
        let last_row = self.text.rope().line_count() - 1;
        let row = n.min(last_row);
        let next = resolve_cursor(self.text.rope(), Row(row), 0);
        self.set_cursor_pos(next, true);
        Ok(())
    }

    pub fn set_cursor(&mut self, row: usize, col: usize) -> CoreResult<()> {
        self.set_cursor_to_line_col(row, col)
    }

    /// `set_cursor_to_line_col`: snaps `col` to the nearest grapheme
    /// boundary `<= col` (covers both "lands on the right half of a wide cluster"
    /// and the general case); clamps out-of-range `row`/`col` to the document end.
    pub fn set_cursor_to_line_col(&mut self, row: usize, col: usize) -> CoreResult<()> {
        self.check_live()?;
        let last_row = self.text.rope().line_count() - 1;
        let row = row.min(last_row);
        let next = resolve_cursor(self.text.rope(), Row(row), col);
        self.set_cursor_pos(next, true);
        Ok(())
    }

    pub fn set_cursor_by_offset(&mut self, byte_offset: usize) -> CoreResult<()> {
        self.check_live()?;
        let next = resolve_cursor_from_byte_offset(self.text.rope(), byte_offset);
        self.set_cursor_pos(next, true);
        Ok(())
    }

    // ---- word boundaries / line queries -----------------------------------------

    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    /// A boundary lies at the first position where `is_word(c_prev) !=
    /// is_word(c_next)`, or at a line break. Operates on chars (not grapheme
    /// clusters) since word-ness is defined char-by-char.
    #[must_use]
    pub fn get_next_word_boundary(&self) -> CursorPos {
        let text = self.full_text();
        let chars: Vec<char> = text.chars().collect();
        let char_off = byte_offset_to_char_offset(&text, self.cursor.offset);
        let mut i = char_off;
        if i >= chars.len() {
            return resolve_cursor_from_byte_offset(self.text.rope(), text.len());
        }
        let start_is_word = Self::is_word_char(chars[i]);
        while i < chars.len() && (chars[i] == '\n' || Self::is_word_char(chars[i]) == start_is_word) {
            if chars[i] == '\n' {
                i += 1;
                break;
            }
            i += 1;
        }
        resolve_cursor_from_byte_offset(self.text.rope(), char_offset_to_byte_offset(&text, i))
    }

    #[must_use]
    pub fn get_prev_word_boundary(&self) -> CursorPos {
        let text = self.full_text();
        let chars: Vec<char> = text.chars().collect();
        let char_off = byte_offset_to_char_offset(&text, self.cursor.offset);
        if char_off == 0 || chars.is_empty() {
            return CursorPos::zero();
        }
        let mut i = char_off - 1;
        let start_is_word = Self::is_word_char(chars[i]);
        loop {
            if i == 0 {
                break;
            }
            if chars[i - 1] == '\n' {
                break;
            }
            if Self::is_word_char(chars[i - 1]) != start_is_word {
                break;
            }
            i -= 1;
        }
        resolve_cursor_from_byte_offset(self.text.rope(), char_offset_to_byte_offset(&text, i))
    }

    #[must_use]
    pub fn get_eol(&self) -> CursorPos {
        let width = self.text.width_policy().str_width(&line_text_of(self.text.rope(), self.cursor.row));
        resolve_cursor(self.text.rope(), self.cursor.row, width)
    }

    #[must_use]
    pub fn offset_to_position(&self, byte_offset: usize) -> CursorPos {
        resolve_cursor_from_byte_offset(self.text.rope(), byte_offset)
    }

    #[must_use]
    pub fn position_to_offset(&self, row: usize, col: usize) -> usize {
        resolve_cursor(self.text.rope(), Row(row), col).offset
    }

    /// Out-of-range `row` clamps to the last line's start.
    #[must_use]
    pub fn get_line_start_offset(&self, row: usize) -> usize {
        let char_off = self.text.rope().line_start_offset(Row(row)).as_usize();
        let text = self.full_text();
        char_offset_to_byte_offset(&text, char_off)
    }

    /// `get_text_range(offset, offset)`: reversed arguments are silently
    /// swapped, out-of-range offsets clamp to the document length.
    #[must_use]
    pub fn get_text_range(&self, a: usize, b: usize) -> String {
        let text = self.full_text();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo = lo.min(text.len());
        let hi = hi.min(text.len());
        // Clamp to char boundaries so a mid-cluster offset never panics.
        let lo = floor_char_boundary(&text, lo);
        let hi = floor_char_boundary(&text, hi);
        text[lo..hi].to_string()
    }

    #[must_use]
    pub fn get_text_range_by_coords(&self, start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> String {
        let a = self.position_to_offset(start_row, start_col);
        let b = self.position_to_offset(end_row, end_col);
        self.get_text_range(a, b)
    }

    // ---- undo/redo ---------------------------------------------------------------

    pub fn undo(&mut self) -> CoreResult<Option<String>> {
        self.check_live()?;
        let Some((text, cursor, meta)) = self.history.undo() else {
            return Ok(None);
        };
        self.text.set_text(text.as_bytes(), false)?;
        self.cursor = cursor;
        self.sticky_col = None;
        self.emit_change();
        Ok(Some(meta))
    }

    pub fn redo(&mut self) -> CoreResult<Option<String>> {
        self.check_live()?;
        let Some((text, cursor, meta)) = self.history.redo() else {
            return Ok(None);
        };
        self.text.set_text(text.as_bytes(), false)?;
        self.cursor = cursor;
        self.sticky_col = None;
        self.emit_change();
        Ok(Some(meta))
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn clear(&mut self) -> CoreResult<()> {
        self.check_live()?;
        self.text.clear()?;
        self.history.clear();
        self.cursor = CursorPos::zero();
        self.sticky_col = None;
        self.emit_change();
        Ok(())
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eb(text: &str) -> EditBuffer {
        let mut b = EditBuffer::new(WidthPolicy::Unicode, Duration::from_millis(500));
        b.set_text(text).unwrap();
        b
    }

    #[test]
    fn insert_text_appends_and_moves_cursor() {
        let mut b = eb("Hello");
        b.set_cursor(0, 5).unwrap();
        b.insert_text(" World").unwrap();
        assert_eq!(b.get_text(), "Hello World");
        assert_eq!(b.get_cursor_position().row.as_usize(), 0);
        assert_eq!(b.get_cursor_position().col, 11);
    }

    #[test]
    fn delete_char_backward_merges_lines() {
        let mut b = eb("Line 1\nLine 2");
        b.set_cursor(1, 0).unwrap();
        b.delete_char_backward().unwrap();
        assert_eq!(b.get_text(), "Line 1Line 2");
        assert_eq!(b.get_cursor_position().row.as_usize(), 0);
        assert_eq!(b.get_cursor_position().col, 6);
    }

    #[test]
    fn move_right_skips_wide_emoji() {
        let mut b = eb("A🌟B");
        b.set_cursor(0, 1).unwrap();
        b.move_cursor_right().unwrap();
        assert_eq!(b.get_cursor_position().col, 3);
    }

    #[test]
    fn undo_redo_roundtrip_replace_text() {
        let mut b = eb("Hello");
        b.replace_text("Goodbye").unwrap();
        assert_eq!(b.get_text(), "Goodbye");
        let meta = b.undo().unwrap();
        assert!(meta.is_some());
        assert_eq!(b.get_text(), "Hello");
        b.redo().unwrap();
        assert_eq!(b.get_text(), "Goodbye");
    }

    #[test]
    fn destroyed_buffer_fails_loudly() {
        let mut b = eb("x");
        b.destroy();
        assert!(matches!(b.insert_text("y"), Err(CoreError::Destroyed)));
    }

    #[test]
    fn word_boundary_at_empty_buffer_start() {
        let b = eb("");
        let prev = b.get_prev_word_boundary();
        assert_eq!((prev.row.as_usize(), prev.col, prev.offset), (0, 0, 0));
    }

    #[test]
    fn events_coalesce_per_settle_point() {
        let mut b = eb("Hello");
        b.set_cursor(0, 5).unwrap();
        b.drain_events();
        b.insert_text(" a").unwrap();
        b.insert_text("b").unwrap();
        let events = b.drain_events();
        assert_eq!(events.iter().filter(|e| **e == EditEvent::ContentChanged).count(), 1);
    }
}
