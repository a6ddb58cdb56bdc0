// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Cursor position and grapheme-aware motion.

use crate::coords::Row;
use crate::rope::Rope;
use crate::width::WidthPolicy;

/// `{row, col, offset}`: `col` is a display column, `offset` is a byte
/// offset into the logical UTF-8 text. Invariant: `offset == position_to_offset(row,
/// col)` at every observable moment, and `col` always aligns to a grapheme boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPos {
    pub row: Row,
    pub col: usize,
    pub offset: usize,
}

impl CursorPos {
    #[must_use]
    pub fn zero() -> Self {
        Self { row: Row(0), col: 0, offset: 0 }
    }
}

/// Converts a char offset (the rope's native unit) to a byte offset into `text`.
#[must_use]
pub fn char_offset_to_byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices().nth(char_offset).map_or(text.len(), |(b, _)| b)
}

/// Converts a byte offset into `text` to a char offset.
#[must_use]
pub fn byte_offset_to_char_offset(text: &str, byte_offset: usize) -> usize {
    text.char_indices().take_while(|(b, _)| *b < byte_offset).count()
}

/// Resolves `(row, display_col)` to a full `CursorPos`, deriving the byte offset via
/// the full text. `rope` must already reflect the document this cursor lives in.
#[must_use]
pub fn resolve_cursor(rope: &Rope, row: Row, display_col: usize) -> CursorPos {
    let char_off = rope.position_to_offset(row, display_col);
    let (actual_row, actual_col) = rope.offset_to_position(char_off).unwrap_or((row, display_col));
    let text = rope.substring(0..rope.len_chars());
    let byte_off = char_offset_to_byte_offset(&text, char_off.as_usize());
    CursorPos { row: actual_row, col: actual_col, offset: byte_off }
}

/// Resolves a byte offset to a full `CursorPos`.
#[must_use]
pub fn resolve_cursor_from_byte_offset(rope: &Rope, byte_offset: usize) -> CursorPos {
    let text = rope.substring(0..rope.len_chars());
    let byte_offset = byte_offset.min(text.len());
    let char_off = byte_offset_to_char_offset(&text, byte_offset);
    let (row, col) = rope.offset_to_position(crate::coords::CharOffset(char_off)).unwrap_or((Row(0), 0));
    CursorPos { row, col, offset: byte_offset }
}

/// Moves the cursor one grapheme cluster right. A width-2 cluster advances `col` by
/// 2.
#[must_use]
pub fn move_right(rope: &Rope, width_policy: WidthPolicy, cursor: CursorPos) -> CursorPos {
    let line_text = line_text_of(rope, cursor.row);
    let clusters = width_policy.segment(&line_text);
    let mut col = 0usize;
    for (cluster, w) in &clusters {
        let cluster_chars = cluster.chars().count();
        let cluster_start_col = col;
        col += *w as usize;
        if cluster_start_col >= cursor.col {
            return resolve_cursor(rope, cursor.row, cluster_start_col + *w as usize);
        }
        let _ = cluster_chars;
    }
    // End of line: move to the start of the next line, if any.
    if cursor.row.as_usize() + 1 < rope.line_count() {
        resolve_cursor(rope, Row(cursor.row.as_usize() + 1), 0)
    } else {
        cursor
    }
}

/// Moves the cursor one grapheme cluster left.
#[must_use]
pub fn move_left(rope: &Rope, width_policy: WidthPolicy, cursor: CursorPos) -> CursorPos {
    if cursor.col == 0 {
        if cursor.row.as_usize() == 0 {
            return cursor;
        }
        let prev_row = Row(cursor.row.as_usize() - 1);
        let prev_line = line_text_of(rope, prev_row);
        let width = width_policy.str_width(&prev_line);
        return resolve_cursor(rope, prev_row, width);
    }
    let line_text = line_text_of(rope, cursor.row);
    let clusters = width_policy.segment(&line_text);
    let mut col = 0usize;
    let mut prev_col = 0usize;
    for (_, w) in &clusters {
        if col >= cursor.col {
            break;
        }
        prev_col = col;
        col += *w as usize;
    }
    resolve_cursor(rope, cursor.row, prev_col)
}

#[must_use]
pub fn line_text_of(rope: &Rope, row: Row) -> String {
    let start = rope.line_start_offset(row).as_usize();
    let text = rope.substring(0..rope.len_chars());
    let end = text
        .chars()
        .enumerate()
        .skip(start)
        .find(|(_, c)| *c == '\n')
        .map_or(text.chars().count(), |(i, _)| i);
    text.chars().skip(start).take(end - start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_right_skips_wide_cluster() {
        let rope = Rope::from_bytes("A🌟B".as_bytes(), true, WidthPolicy::Unicode);
        let cursor = resolve_cursor(&rope, Row(0), 1);
        let moved = move_right(&rope, WidthPolicy::Unicode, cursor);
        assert_eq!(moved.col, 3);
    }

    #[test]
    fn move_left_at_line_start_merges_to_prev_line_end() {
        let rope = Rope::from_bytes(b"Line 1\nLine 2", true, WidthPolicy::Unicode);
        let cursor = resolve_cursor(&rope, Row(1), 0);
        let moved = move_left(&rope, WidthPolicy::Unicode, cursor);
        assert_eq!(moved.row, Row(0));
        assert_eq!(moved.col, 6);
    }
}
