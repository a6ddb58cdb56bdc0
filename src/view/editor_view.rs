// Licensed under the Apache License, Version 2.0. See LICENSE.

//! `EditorView`: a viewport window, scroll margin, and visual cursor
//! atop a `TextBufferView`.

use crate::cell::Rgba;
use crate::coords::Row;
use crate::text_buffer::TextBuffer;
use crate::width::WidthPolicy;

use super::text_buffer_view::TextBufferView;
use super::wrap::WrapMode;

/// `{visual_row, visual_col, logical_row, logical_col, offset}` returned by
/// `get_visual_cursor`. `offset` is the byte offset into the logical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisualCursor {
    pub visual_row: usize,
    pub visual_col: usize,
    pub logical_row: usize,
    pub logical_col: usize,
    pub offset: usize,
}

/// Viewport window, scroll margin, and visual cursor atop a [`TextBufferView`].
pub struct EditorView {
    view: TextBufferView,
    width_policy: WidthPolicy,
    offset_x: usize,
    offset_y: usize,
    scroll_margin: f32,
    logical_row: usize,
    logical_col: usize,
    sticky_visual_col: Option<usize>,
}

impl EditorView {
    #[must_use]
    pub fn new(width_policy: WidthPolicy) -> Self {
        Self {
            view: TextBufferView::new(width_policy),
            width_policy,
            offset_x: 0,
            offset_y: 0,
            scroll_margin: 0.0,
            logical_row: 0,
            logical_col: 0,
            sticky_visual_col: None,
        }
    }

    #[must_use]
    pub fn text_buffer_view(&self) -> &TextBufferView {
        &self.view
    }

    pub fn set_wrap_mode(&mut self, mode: WrapMode) {
        self.view.set_wrap_mode(mode);
    }

    pub fn set_wrap_width(&mut self, width: Option<usize>) {
        self.view.set_wrap_width(width);
    }

    pub fn set_viewport_size(&mut self, w: usize, h: usize) {
        self.view.set_viewport_size(w, h);
    }

    #[must_use]
    pub fn get_viewport(&self) -> (usize, usize, usize, usize) {
        let (w, h) = self.view.viewport_size();
        (self.offset_x, self.offset_y, w, h)
    }

    /// Clamped to `[0, 0.45]`.
    pub fn set_scroll_margin(&mut self, fraction: f32) {
        self.scroll_margin = fraction.clamp(0.0, 0.45);
    }

    #[must_use]
    pub fn get_total_virtual_line_count(&self, text: &TextBuffer) -> usize {
        self.view.line_info(text).line_starts.len()
    }

    /// Number of virtual lines visible within the current viewport height.
    #[must_use]
    pub fn get_virtual_line_count(&self, text: &TextBuffer) -> usize {
        let (_, h) = self.view.viewport_size();
        let total = self.get_total_virtual_line_count(text);
        if h == 0 { total } else { total.saturating_sub(self.offset_y).min(h) }
    }

    fn visual_row_of(&self, text: &TextBuffer, logical_row: usize, logical_col: usize) -> (usize, usize) {
        let info = self.view.line_info(text);
        // Find the visual segment belonging to `logical_row` whose [start_col,
        // start_col+width) window contains logical_col (or the last one, for EOL).
        let mut last_in_row: Option<(usize, usize)> = None; // (visual_row, start_col)
        for (visual_row, (&src, &start)) in info.line_sources.iter().zip(info.line_starts.iter()).enumerate() {
            if src as usize != logical_row {
                continue;
            }
            let width = info.line_widths[visual_row] as usize;
            let seg_local_start = start as usize - row_global_base(&info, logical_row);
            last_in_row = Some((visual_row, seg_local_start));
            if logical_col >= seg_local_start && logical_col < seg_local_start + width {
                return (visual_row, logical_col - seg_local_start);
            }
        }
        if let Some((visual_row, seg_local_start)) = last_in_row {
            return (visual_row, logical_col.saturating_sub(seg_local_start));
        }
        (0, logical_col)
    }

    /// Sets the cursor by document byte offset and recomputes the visual position,
    /// applying the scroll policy.
    pub fn set_cursor_by_offset(&mut self, text: &TextBuffer, byte_offset: usize) {
        let full = text.get_plain_text(None);
        let char_off = byte_offset_to_char_offset(&full, byte_offset);
        let rope = text.rope();
        let Some((row, col)) = rope.offset_to_position(crate::coords::CharOffset(char_off)) else {
            return;
        };
        self.logical_row = row.as_usize();
        self.logical_col = col;
        self.sticky_visual_col = None;
        self.apply_scroll_policy(text);
    }

    #[must_use]
    pub fn get_visual_cursor(&self, text: &TextBuffer) -> VisualCursor {
        let (visual_row, visual_col) = self.visual_row_of(text, self.logical_row, self.logical_col);
        let rope = text.rope();
        let char_off = rope.position_to_offset(Row(self.logical_row), self.logical_col).as_usize();
        let full = text.get_plain_text(None);
        let offset = char_offset_to_byte_offset(&full, char_off);
        VisualCursor {
            visual_row: visual_row.saturating_sub(self.offset_y),
            visual_col: visual_col.saturating_sub(self.offset_x),
            logical_row: self.logical_row,
            logical_col: self.logical_col,
            offset,
        }
    }

    /// Scroll so the visual cursor stays within `scroll_margin * viewport_height`
    /// of the top/bottom (and, under `wrap_mode == none`, the left/right).
    fn apply_scroll_policy(&mut self, text: &TextBuffer) {
        let (viewport_w, viewport_h) = self.view.viewport_size();
        if viewport_h == 0 {
            return;
        }
        let (visual_row, visual_col) = self.visual_row_of(text, self.logical_row, self.logical_col);
        let margin_rows = (self.scroll_margin * viewport_h as f32).round() as usize;

        if visual_row < self.offset_y + margin_rows {
            self.offset_y = visual_row.saturating_sub(margin_rows);
        } else if visual_row >= self.offset_y + viewport_h.saturating_sub(margin_rows) {
            self.offset_y = visual_row + margin_rows + 1 - viewport_h;
        }

        if self.view.wrap_mode() == WrapMode::None && viewport_w > 0 {
            let margin_cols = (self.scroll_margin * viewport_w as f32).round() as usize;
            if visual_col < self.offset_x + margin_cols {
                self.offset_x = visual_col.saturating_sub(margin_cols);
            } else if visual_col >= self.offset_x + viewport_w.saturating_sub(margin_cols) {
                self.offset_x = visual_col + margin_cols + 1 - viewport_w;
            }
        }
    }

    /// Moves the cursor one **visual** row up, preserving the sticky visual column
    ///.
    pub fn move_up_visual(&mut self, text: &TextBuffer) {
        let info = self.view.line_info(text);
        let (cur_visual_row, cur_visual_col) = self.visual_row_of(text, self.logical_row, self.logical_col);
        if cur_visual_row == 0 {
            return;
        }
        let target_col = *self.sticky_visual_col.get_or_insert(cur_visual_col);
        self.goto_visual_row(&info, cur_visual_row - 1, target_col);
        self.apply_scroll_policy(text);
    }

    pub fn move_down_visual(&mut self, text: &TextBuffer) {
        let info = self.view.line_info(text);
        let (cur_visual_row, cur_visual_col) = self.visual_row_of(text, self.logical_row, self.logical_col);
        if cur_visual_row + 1 >= info.line_starts.len() {
            return;
        }
        let target_col = *self.sticky_visual_col.get_or_insert(cur_visual_col);
        self.goto_visual_row(&info, cur_visual_row + 1, target_col);
        self.apply_scroll_policy(text);
    }

    fn goto_visual_row(&mut self, info: &super::text_buffer_view::LineInfo, visual_row: usize, visual_col: usize) {
        let Some(&src) = info.line_sources.get(visual_row) else { return };
        let width = info.line_widths[visual_row] as usize;
        let start = info.line_starts[visual_row] as usize;
        let row_base = row_global_base(info, src as usize);
        let seg_local_start = start - row_base;
        self.logical_row = src as usize;
        self.logical_col = seg_local_start + visual_col.min(width);
    }

    #[must_use]
    pub fn get_visual_sol(&self, text: &TextBuffer) -> VisualCursor {
        let (visual_row, _) = self.visual_row_of(text, self.logical_row, self.logical_col);
        let info = self.view.line_info(text);
        let Some(&src) = info.line_sources.get(visual_row) else {
            return self.get_visual_cursor(text);
        };
        let start = info.line_starts[visual_row] as usize;
        let row_base = row_global_base(&info, src as usize);
        let logical_col = start - row_base;
        self.cursor_at(text, src as usize, logical_col)
    }

    /// For a *non-final* wrap segment of a logical line, "end of line" is the last
    /// occupied column, not one-past — the column right after it is already the first
    /// character of the next visual segment, since wrapping (unlike a real line
    /// break) leaves no gap between segments. The final segment of a logical line
    /// gets the usual one-past-the-end column.
    #[must_use]
    pub fn get_visual_eol(&self, text: &TextBuffer) -> VisualCursor {
        let (visual_row, _) = self.visual_row_of(text, self.logical_row, self.logical_col);
        let info = self.view.line_info(text);
        let Some(&src) = info.line_sources.get(visual_row) else {
            return self.get_visual_cursor(text);
        };
        let start = info.line_starts[visual_row] as usize;
        let width = info.line_widths[visual_row] as usize;
        let row_base = row_global_base(&info, src as usize);
        let is_last_segment_of_row =
            info.line_sources.get(visual_row + 1).map_or(true, |&next_src| next_src as usize != src as usize);
        let logical_col =
            if is_last_segment_of_row { start - row_base + width } else { start - row_base + width.saturating_sub(1) };
        self.cursor_at(text, src as usize, logical_col)
    }

    fn cursor_at(&self, text: &TextBuffer, logical_row: usize, logical_col: usize) -> VisualCursor {
        let (visual_row, visual_col) = self.visual_row_of(text, logical_row, logical_col);
        let rope = text.rope();
        let char_off = rope.position_to_offset(Row(logical_row), logical_col).as_usize();
        let full = text.get_plain_text(None);
        let offset = char_offset_to_byte_offset(&full, char_off);
        VisualCursor {
            visual_row: visual_row.saturating_sub(self.offset_y),
            visual_col: visual_col.saturating_sub(self.offset_x),
            logical_row,
            logical_col,
            offset,
        }
    }

    /// Word boundaries, mirrored from `EditBuffer`'s definition of `is_word`
    /// (alphanumeric or underscore).
    #[must_use]
    pub fn get_next_word_boundary(&self, text: &TextBuffer) -> VisualCursor {
        let full = text.get_plain_text(None);
        let chars: Vec<char> = full.chars().collect();
        let char_off = text.rope().position_to_offset(Row(self.logical_row), self.logical_col).as_usize();
        let mut i = char_off;
        if i >= chars.len() {
            return self.get_visual_cursor(text);
        }
        let start_is_word = is_word_char(chars[i]);
        while i < chars.len() && (chars[i] == '\n' || is_word_char(chars[i]) == start_is_word) {
            if chars[i] == '\n' {
                i += 1;
                break;
            }
            i += 1;
        }
        let Some((row, col)) = text.rope().offset_to_position(crate::coords::CharOffset(i)) else {
            return self.get_visual_cursor(text);
        };
        self.cursor_at(text, row.as_usize(), col)
    }

    #[must_use]
    pub fn get_prev_word_boundary(&self, text: &TextBuffer) -> VisualCursor {
        let full = text.get_plain_text(None);
        let chars: Vec<char> = full.chars().collect();
        let char_off = text.rope().position_to_offset(Row(self.logical_row), self.logical_col).as_usize();
        if char_off == 0 || chars.is_empty() {
            return self.cursor_at(text, 0, 0);
        }
        let mut i = char_off - 1;
        let start_is_word = is_word_char(chars[i]);
        loop {
            if i == 0 {
                break;
            }
            if chars[i - 1] == '\n' || is_word_char(chars[i - 1]) != start_is_word {
                break;
            }
            i -= 1;
        }
        let Some((row, col)) = text.rope().offset_to_position(crate::coords::CharOffset(i)) else {
            return self.get_visual_cursor(text);
        };
        self.cursor_at(text, row.as_usize(), col)
    }

    #[must_use]
    pub fn logical_to_visual_cursor(&self, text: &TextBuffer, logical_row: usize, logical_col: usize) -> VisualCursor {
        self.cursor_at(text, logical_row, logical_col)
    }

    #[must_use]
    pub fn visual_to_logical_cursor(&self, text: &TextBuffer, visual_row: usize, visual_col: usize) -> VisualCursor {
        let info = self.view.line_info(text);
        let absolute_visual_row = visual_row + self.offset_y;
        let Some(&src) = info.line_sources.get(absolute_visual_row) else {
            return self.get_visual_cursor(text);
        };
        let start = info.line_starts[absolute_visual_row] as usize;
        let width = info.line_widths[absolute_visual_row] as usize;
        let row_base = row_global_base(&info, src as usize);
        let logical_col = (start - row_base) + visual_col.min(width);
        self.cursor_at(text, src as usize, logical_col)
    }

    // ---- selection mirror (visual coordinates) ----------------------------------

    pub fn set_selection(&mut self, text: &TextBuffer, start_row: usize, start_col: usize, end_row: usize, end_col: usize, bg: Option<Rgba>, fg: Option<Rgba>) {
        self.view.set_local_selection(text, start_col, start_row + self.offset_y, end_col, end_row + self.offset_y, bg, fg);
    }

    pub fn update_selection(&mut self, text: &TextBuffer, row: usize, col: usize) {
        self.view.update_local_selection(text, col, row + self.offset_y);
    }

    pub fn reset_selection(&mut self) {
        self.view.reset_selection();
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.view.has_selection()
    }

    #[must_use]
    pub fn get_selected_text(&self, text: &TextBuffer) -> String {
        self.view.get_selected_text(text)
    }

    /// Deletes the current selection in place. Returns the deleted char range (in
    /// the rope's char-offset space) so the caller's `EditBuffer`/undo layer can
    /// record it; `EditorView` itself has no undo journal.
    pub fn delete_selected_text(&mut self, text: &mut TextBuffer) -> Option<std::ops::Range<usize>> {
        let (lo, hi) = self.view.get_selection()?;
        let rope = text.rope();
        let (lo_row, lo_col) = global_offset_to_row_col_pub(text, self.width_policy, lo);
        let (hi_row, hi_col) = global_offset_to_row_col_pub(text, self.width_policy, hi);
        let start_char = rope.position_to_offset(lo_row, lo_col).as_usize();
        let end_char = rope.position_to_offset(hi_row, hi_col).as_usize();
        text.splice_raw(start_char..end_char, b"").ok()?;
        self.view.reset_selection();
        self.logical_row = lo_row.as_usize();
        self.logical_col = lo_col;
        Some(start_char..end_char)
    }
}

fn row_global_base(info: &super::text_buffer_view::LineInfo, logical_row: usize) -> usize {
    info.line_sources
        .iter()
        .zip(info.line_starts.iter())
        .zip(info.line_wraps.iter())
        .find(|((&src, _), &wrap_idx)| src as usize == logical_row && wrap_idx == 0)
        .map_or(0, |((_, &start), _)| start as usize)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn byte_offset_to_char_offset(text: &str, byte_offset: usize) -> usize {
    text.char_indices().take_while(|(b, _)| *b < byte_offset).count()
}

fn char_offset_to_byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices().nth(char_offset).map_or(text.len(), |(b, _)| b)
}

fn global_offset_to_row_col_pub(text: &TextBuffer, width_policy: WidthPolicy, global_offset: usize) -> (Row, usize) {
    let rope = text.rope();
    let line_count = rope.line_count();
    let mut consumed = 0usize;
    for row in 0..line_count {
        let start = rope.line_start_offset(Row(row)).as_usize();
        let full = rope.substring(0..rope.len_chars());
        let end = full.chars().enumerate().skip(start).find(|(_, c)| *c == '\n').map_or(full.chars().count(), |(i, _)| i);
        let line: String = full.chars().skip(start).take(end - start).collect();
        let width = width_policy.str_width(&line);
        if global_offset <= consumed + width {
            return (Row(row), global_offset - consumed);
        }
        consumed += width + 1;
    }
    let last_row = line_count.saturating_sub(1);
    (Row(last_row), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tb(text: &str) -> TextBuffer {
        let mut tb = TextBuffer::new(WidthPolicy::Unicode);
        tb.set_text(text.as_bytes(), true).unwrap();
        tb
    }

    #[test]
    fn visual_cursor_after_char_wrap() {
        let buf = tb("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        let mut ev = EditorView::new(WidthPolicy::Unicode);
        ev.set_wrap_mode(WrapMode::Char);
        ev.set_wrap_width(Some(10));
        ev.set_cursor_by_offset(&buf, 15);
        let vc = ev.get_visual_cursor(&buf);
        assert_eq!(vc.visual_row, 1);
        assert_eq!(vc.visual_col, 5);
    }

    #[test]
    fn visual_eol_matches_logical_line_end() {
        let buf = tb("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        let mut ev = EditorView::new(WidthPolicy::Unicode);
        ev.set_wrap_mode(WrapMode::Char);
        ev.set_wrap_width(Some(10));
        ev.set_cursor_by_offset(&buf, 15);
        let eol = ev.get_visual_eol(&buf);
        assert_eq!(eol.logical_col, 19);
    }

    #[test]
    fn scroll_margin_clamps_to_range() {
        let mut ev = EditorView::new(WidthPolicy::Unicode);
        ev.set_scroll_margin(0.9);
        assert!((ev.scroll_margin - 0.45).abs() < f32::EPSILON);
        ev.set_scroll_margin(-1.0);
        assert!((ev.scroll_margin - 0.0).abs() < f32::EPSILON);
    }
}
