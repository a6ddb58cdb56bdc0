// Licensed under the Apache License, Version 2.0. See LICENSE.

//! `TextBufferView`: a read-only, wrap-aware projection of a
//! `TextBuffer`, plus a byte-range-ish selection expressed in "global display
//! offsets" (see module doc below).
//!
//! **Global display offset.** Both `line_starts` and `set_selection`'s `start`/`end`
//! read naturally as "display-column offsets from the logical-line start", yet
//! `"Hello\nWorld"` producing `line_starts == [0, 6]` only makes sense if those
//! offsets are measured from the *document's* start, with each newline counted as one
//! column. This module implements that single unified coordinate: offset 0 is the
//! first cell of the document, and crossing a logical line boundary costs exactly one
//! unit for the newline itself.

use std::cell::RefCell;

use crate::cell::Rgba;
use crate::coords::Row;
use crate::text_buffer::TextBuffer;
use crate::width::WidthPolicy;

use super::wrap::{wrap_line, VisualSegment, WrapMode};

#[derive(Debug, Clone, Default)]
pub struct LineInfo {
    pub line_starts: Vec<u32>,
    pub line_widths: Vec<u32>,
    pub line_sources: Vec<u32>,
    pub line_wraps: Vec<u32>,
    pub max_line_width: u32,
}

#[derive(Debug, Clone, Copy)]
struct Selection {
    anchor: usize,
    focus: usize,
    bg: Option<Rgba>,
    fg: Option<Rgba>,
}

struct Cache {
    version: u64,
    wrap_mode: WrapMode,
    wrap_width: Option<usize>,
    viewport_w: usize,
    info: LineInfo,
}

/// Read-only wrap/selection projection over an external `TextBuffer`. Deliberately
/// does not own the buffer it projects — callers pass a `&TextBuffer` into every
/// method, keeping the view itself a thin, mostly stateless layer.
pub struct TextBufferView {
    wrap_mode: WrapMode,
    wrap_width: Option<usize>,
    viewport_w: usize,
    viewport_h: usize,
    width_policy: WidthPolicy,
    cache: RefCell<Option<Cache>>,
    selection: Option<Selection>,
}

impl TextBufferView {
    #[must_use]
    pub fn new(width_policy: WidthPolicy) -> Self {
        Self {
            wrap_mode: WrapMode::None,
            wrap_width: None,
            viewport_w: 0,
            viewport_h: 0,
            width_policy,
            cache: RefCell::new(None),
            selection: None,
        }
    }

    pub fn set_wrap_mode(&mut self, mode: WrapMode) {
        self.wrap_mode = mode;
        self.invalidate();
    }

    pub fn set_wrap_width(&mut self, width: Option<usize>) {
        self.wrap_width = width;
        self.invalidate();
    }

    /// A change of viewport width invalidates the cached wrap structure; height
    /// alone does not, since wrap never depends on it.
    pub fn set_viewport_size(&mut self, w: usize, h: usize) {
        if w != self.viewport_w {
            self.invalidate();
        }
        self.viewport_w = w;
        self.viewport_h = h;
    }

    #[must_use]
    pub fn viewport_size(&self) -> (usize, usize) {
        (self.viewport_w, self.viewport_h)
    }

    #[must_use]
    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    #[must_use]
    pub fn wrap_width(&self) -> Option<usize> {
        self.wrap_width
    }

    fn invalidate(&mut self) {
        *self.cache.borrow_mut() = None;
    }

    /// Forces recomputation on the next `line_info` call, regardless of version.
    pub fn mark_dirty(&mut self) {
        self.invalidate();
    }

    /// Recomputes only if `text`'s version, `wrap_mode`, `wrap_width`, or viewport
    /// width changed since the last call.
    #[must_use]
    pub fn line_info(&self, text: &TextBuffer) -> LineInfo {
        let mut cache = self.cache.borrow_mut();
        let stale = match cache.as_ref() {
            Some(c) => {
                c.version != text.version()
                    || c.wrap_mode != self.wrap_mode
                    || c.wrap_width != self.wrap_width
                    || c.viewport_w != self.viewport_w
            }
            None => true,
        };
        if stale {
            let info = compute_line_info(text, self.width_policy, self.wrap_mode, self.wrap_width);
            *cache = Some(Cache {
                version: text.version(),
                wrap_mode: self.wrap_mode,
                wrap_width: self.wrap_width,
                viewport_w: self.viewport_w,
                info,
            });
        }
        cache.as_ref().expect("populated above").info.clone()
    }

    /// Computes `{line_count, max_width}` as if `wrap_width` were `w`, without
    /// touching the cache. `h_hint` is accepted for API parity — wrap structure never
    /// depends on height.
    #[must_use]
    pub fn measure_for_dimensions(&self, text: &TextBuffer, w: usize, _h_hint: usize) -> (usize, usize) {
        let info = compute_line_info(text, self.width_policy, self.wrap_mode, Some(w));
        let line_count = info.line_starts.len();
        let max_width = info.max_line_width as usize;
        (line_count, max_width)
    }

    #[must_use]
    pub fn get_plain_text(&self, text: &TextBuffer) -> String {
        text.get_plain_text(None)
    }

    // ---- selection (global display-offset coordinates) -------------------------

    pub fn set_selection(&mut self, start: usize, end: usize, bg: Option<Rgba>, fg: Option<Rgba>) {
        self.selection = Some(Selection { anchor: start, focus: end, bg, fg });
    }

    pub fn update_selection(&mut self, focus: usize) {
        if let Some(sel) = &mut self.selection {
            sel.focus = focus;
        }
    }

    /// `(ax, ay)`/`(fx, fy)` are visual `(row, col)` pairs within this view's
    /// current wrap structure; converted to global display offsets via `line_info`.
    pub fn set_local_selection(&mut self, text: &TextBuffer, ax: usize, ay: usize, fx: usize, fy: usize, bg: Option<Rgba>, fg: Option<Rgba>) {
        let anchor = self.local_to_global(text, ay, ax);
        let focus = self.local_to_global(text, fy, fx);
        self.selection = Some(Selection { anchor, focus, bg, fg });
    }

    pub fn update_local_selection(&mut self, text: &TextBuffer, fx: usize, fy: usize) {
        let focus = self.local_to_global(text, fy, fx);
        self.update_selection(focus);
    }

    fn local_to_global(&self, text: &TextBuffer, visual_row: usize, visual_col: usize) -> usize {
        let info = self.line_info(text);
        let Some(&start) = info.line_starts.get(visual_row) else {
            return global_text_width(text, self.width_policy);
        };
        let width = info.line_widths.get(visual_row).copied().unwrap_or(0) as usize;
        start as usize + visual_col.min(width)
    }

    pub fn reset_selection(&mut self) {
        self.selection = None;
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    /// Returns `(start, end)` in document order (anchor/focus un-swapped order is
    /// preserved internally; callers asking "what range is selected" get it sorted).
    #[must_use]
    pub fn get_selection(&self) -> Option<(usize, usize)> {
        self.selection.map(|s| if s.anchor <= s.focus { (s.anchor, s.focus) } else { (s.focus, s.anchor) })
    }

    #[must_use]
    pub fn get_selected_text(&self, text: &TextBuffer) -> String {
        let Some((lo, hi)) = self.get_selection() else {
            return String::new();
        };
        let rope = text.rope();
        let (lo_row, lo_col) = global_offset_to_row_col(text, self.width_policy, lo);
        let (hi_row, hi_col) = global_offset_to_row_col(text, self.width_policy, hi);
        let start_char = rope.position_to_offset(lo_row, lo_col).as_usize();
        let end_char = rope.position_to_offset(hi_row, hi_col).as_usize();
        rope.substring(start_char..end_char)
    }
}

fn compute_line_info(text: &TextBuffer, width_policy: WidthPolicy, mode: WrapMode, wrap_width: Option<usize>) -> LineInfo {
    let rope = text.rope();
    let line_count = rope.line_count();
    let mut out = LineInfo::default();
    let mut global_col = 0u32;

    for row in 0..line_count {
        let line = line_text(text, Row(row));
        let segments: Vec<VisualSegment> = wrap_line(&line, width_policy, mode, wrap_width);
        for (wrap_idx, seg) in segments.iter().enumerate() {
            out.line_starts.push(global_col + seg.start_col as u32);
            out.line_widths.push(seg.width as u32);
            out.line_sources.push(row as u32);
            out.line_wraps.push(wrap_idx as u32);
            out.max_line_width = out.max_line_width.max(seg.width as u32);
        }
        let line_width = width_policy.str_width(&line) as u32;
        global_col += line_width + 1; // +1 for the newline separator
    }

    if out.line_starts.is_empty() {
        out.line_starts.push(0);
        out.line_widths.push(0);
    }
    out
}

fn global_text_width(text: &TextBuffer, width_policy: WidthPolicy) -> usize {
    let rope = text.rope();
    let line_count = rope.line_count();
    let mut total = 0usize;
    for row in 0..line_count {
        let line = line_text(text, Row(row));
        total += width_policy.str_width(&line);
        if row + 1 < line_count {
            total += 1;
        }
    }
    total
}

fn global_offset_to_row_col(text: &TextBuffer, width_policy: WidthPolicy, global_offset: usize) -> (Row, usize) {
    let rope = text.rope();
    let line_count = rope.line_count();
    let mut consumed = 0usize;
    for row in 0..line_count {
        let line = line_text(text, Row(row));
        let width = width_policy.str_width(&line);
        if global_offset <= consumed + width {
            return (Row(row), global_offset - consumed);
        }
        consumed += width + 1;
    }
    let last_row = line_count.saturating_sub(1);
    let line = line_text(text, Row(last_row));
    (Row(last_row), width_policy.str_width(&line))
}

fn line_text(text: &TextBuffer, row: Row) -> String {
    let rope = text.rope();
    let start = rope.line_start_offset(row).as_usize();
    let full = rope.substring(0..rope.len_chars());
    let end = full
        .chars()
        .enumerate()
        .skip(start)
        .find(|(_, c)| *c == '\n')
        .map_or(full.chars().count(), |(i, _)| i);
    full.chars().skip(start).take(end - start).collect()
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
    fn line_info_none_wrap_two_lines() {
        let buf = tb("Hello\nWorld");
        let view = TextBufferView::new(WidthPolicy::Unicode);
        let info = view.line_info(&buf);
        assert_eq!(info.line_starts, vec![0, 6]);
        assert_eq!(info.line_widths, vec![5, 5]);
    }

    #[test]
    fn line_info_char_wrap_matches_scenario() {
        let buf = tb("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        let mut view = TextBufferView::new(WidthPolicy::Unicode);
        view.set_wrap_mode(WrapMode::Char);
        view.set_wrap_width(Some(10));
        let info = view.line_info(&buf);
        assert_eq!(info.line_starts, vec![0, 10, 20]);
        assert_eq!(info.line_widths, vec![10, 10, 6]);
    }

    #[test]
    fn empty_buffer_has_single_zero_width_line() {
        let buf = tb("");
        let view = TextBufferView::new(WidthPolicy::Unicode);
        let info = view.line_info(&buf);
        assert_eq!(info.line_starts, vec![0]);
        assert_eq!(info.line_widths, vec![0]);
    }

    #[test]
    fn selection_over_single_line() {
        let buf = tb("Hello World");
        let mut view = TextBufferView::new(WidthPolicy::Unicode);
        view.set_selection(6, 11, None, None);
        assert_eq!(view.get_selected_text(&buf), "World");
    }

    #[test]
    fn measure_for_dimensions_does_not_mutate_cache() {
        let buf = tb("ABCDEFGHIJ");
        let mut view = TextBufferView::new(WidthPolicy::Unicode);
        view.set_wrap_mode(WrapMode::Char);
        view.set_wrap_width(Some(20));
        let before = view.line_info(&buf);
        let _ = view.measure_for_dimensions(&buf, 3, 0);
        let after = view.line_info(&buf);
        assert_eq!(before.line_widths, after.line_widths);
    }
}
