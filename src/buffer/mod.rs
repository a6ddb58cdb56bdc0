// Licensed under the Apache License, Version 2.0. See LICENSE.

//! `OptimizedBuffer`: a cell grid with alpha-blended drawing primitives, a scissor
//! stack, and diff-based flushing — a flat row-major array of cells plus a "what's
//! actually different from last frame" query the renderer drives at flush time.

pub mod scissor;

use crate::cell::{Attrs, Cell, CellWidth, Rgba};
use crate::coords::Rect;
use crate::error::fatal_in_debug;
use crate::width::WidthPolicy;

pub use scissor::ScissorStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Live,
    Destroyed,
}

/// Eight border-drawing glyphs for `draw_box`, indexed
/// top-left/top/top-right/right/bottom-right/bottom/bottom-left/left.
#[derive(Debug, Clone, Copy)]
pub struct BorderChars {
    pub top_left: char,
    pub top: char,
    pub top_right: char,
    pub right: char,
    pub bottom_right: char,
    pub bottom: char,
    pub bottom_left: char,
    pub left: char,
}

impl BorderChars {
    pub const SINGLE: BorderChars = BorderChars {
        top_left: '┌',
        top: '─',
        top_right: '┐',
        right: '│',
        bottom_right: '┘',
        bottom: '─',
        bottom_left: '└',
        left: '│',
    };
}

/// `draw_box` options: which edges to draw and whether to reserve a
/// title slot on the top edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxOptions {
    pub draw_top: bool,
    pub draw_right: bool,
    pub draw_bottom: bool,
    pub draw_left: bool,
}

impl BoxOptions {
    #[must_use]
    pub fn all() -> Self {
        Self { draw_top: true, draw_right: true, draw_bottom: true, draw_left: true }
    }
}

/// A source rectangle for `draw_frame_buffer`: `None` means "the whole
/// source buffer".
#[derive(Debug, Clone, Copy)]
pub struct SrcRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// The cell grid. Origin top-left, cell-based
/// coordinates throughout. Holds exactly one frame's worth of cells — the
/// front/back double-buffering lives one layer up, in [`crate::renderer::Renderer`],
/// which owns two `OptimizedBuffer`s and diffs between them.
pub struct OptimizedBuffer {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    default_bg: Rgba,
    /// Whether this buffer participates in background blending when drawn onto
    /// another buffer via `draw_frame_buffer`.
    respect_alpha: bool,
    width_policy: WidthPolicy,
    scissors: ScissorStack,
    lifecycle: Lifecycle,
}

impl OptimizedBuffer {
    #[must_use]
    pub fn new(width: u32, height: u32, width_policy: WidthPolicy) -> Self {
        let cells = vec![Cell::blank(Rgba::WHITE, Rgba::TRANSPARENT); (width as usize) * (height as usize)];
        Self {
            width,
            height,
            cells,
            default_bg: Rgba::TRANSPARENT,
            respect_alpha: true,
            width_policy,
            scissors: ScissorStack::new(),
            lifecycle: Lifecycle::Live,
        }
    }

    /// `OptimizedBuffer`'s drawing primitives have no `Result` return (they silently
    /// discard out-of-bounds writes), so a post-destroy call is treated the same
    /// programmer-error way as scissor underflow: fatal in debug, a warning and a
    /// no-op in release.
    fn assert_live(&self) {
        if self.lifecycle == Lifecycle::Destroyed {
            fatal_in_debug("OptimizedBuffer method called after destroy()");
        }
    }

    /// Idempotent; further method calls fail loudly in debug builds. Also collapses the grid to zero dimensions so that, in
    /// release builds where `assert_live` only warns, every coordinate lookup
    /// naturally misses instead of indexing into the now-empty `cells` vec.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.cells.clear();
        self.width = 0;
        self.height = 0;
        self.lifecycle = Lifecycle::Destroyed;
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn respect_alpha(&self) -> bool {
        self.respect_alpha
    }

    pub fn set_respect_alpha(&mut self, respect: bool) {
        self.respect_alpha = respect;
    }

    #[must_use]
    pub fn width_policy(&self) -> WidthPolicy {
        self.width_policy
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    #[must_use]
    pub fn get_cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Effective clip rect: grid bounds intersected with every entry on the scissor
    /// stack.
    fn effective_clip(&self) -> Option<Rect> {
        let grid = Rect::new(0, 0, self.width, self.height);
        self.scissors.effective_clip(grid)
    }

    fn in_clip(&self, x: i32, y: i32) -> bool {
        match self.effective_clip() {
            Some(clip) => clip.contains(x, y),
            None => false,
        }
    }

    /// `push_scissor`.
    pub fn push_scissor(&mut self, x: i32, y: i32, w: u32, h: u32) {
        self.scissors.push(Rect::new(x, y, w, h));
    }

    /// `pop_scissor`: underflow is a programming error, fatal in debug builds and a
    /// no-op in release.
    pub fn pop_scissor(&mut self) {
        if self.scissors.pop().is_none() {
            fatal_in_debug("pop_scissor: scissor stack underflow");
        }
    }

    pub fn clear_scissors(&mut self) {
        self.scissors.clear();
    }

    /// `clear(bg)`: fills every cell, ignoring the scissor stack — `clear` resets the
    /// whole grid regardless of any active clip.
    pub fn clear(&mut self, bg: Rgba) {
        self.default_bg = bg;
        for cell in &mut self.cells {
            *cell = Cell::blank(Rgba::TRANSPARENT, bg);
        }
    }

    /// `fill_rect`: writes outside the grid or current clip are silently
    /// discarded.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgba) {
        for row in y..y + w_as_i32(h) {
            for col in x..x + w_as_i32(w) {
                self.set_cell(col, row, ' ' as u32, Rgba::TRANSPARENT, color, Attrs::empty());
            }
        }
    }

    /// Clears the owning left cell of a width-2 pair when `(x, y)` currently holds
    /// that pair's continuation sentinel: a cluster whose left half would land on the
    /// right half of an existing width-2 cell must first clear the owning cell (both
    /// halves) to avoid orphan continuations.
    fn clear_continuation_owner(&mut self, x: i32, y: i32) {
        if let Some(i) = self.index(x, y) {
            if self.cells[i].is_continuation() && x > 0 {
                if let Some(owner_i) = self.index(x - 1, y) {
                    let bg = self.cells[owner_i].bg;
                    self.cells[owner_i] = Cell::blank(Rgba::WHITE, bg);
                    self.cells[i] = Cell::blank(Rgba::WHITE, bg);
                }
            }
        }
    }

    /// `set_cell`: overwrites unconditionally (no blending).
    pub fn set_cell(&mut self, x: i32, y: i32, codepoint: u32, fg: Rgba, bg: Rgba, attrs: Attrs) {
        if !self.in_clip(x, y) {
            return;
        }
        self.clear_continuation_owner(x, y);
        let Some(i) = self.index(x, y) else { return };
        self.cells[i] = Cell { codepoint, fg, bg, attrs, width: CellWidth::Narrow };
    }

    /// `set_cell_blend`: straight-alpha "over" compositing of both `fg`
    /// and `bg` against the existing cell.
    pub fn set_cell_blend(&mut self, x: i32, y: i32, codepoint: u32, fg: Rgba, bg: Rgba, attrs: Attrs) {
        if !self.in_clip(x, y) {
            return;
        }
        self.clear_continuation_owner(x, y);
        let Some(i) = self.index(x, y) else { return };
        let existing = self.cells[i];
        let blended_fg = fg.blend_over(existing.fg);
        let blended_bg = bg.blend_over(existing.bg);
        self.cells[i] = Cell { codepoint, fg: blended_fg, bg: blended_bg, attrs, width: CellWidth::Narrow };
    }

    fn write_wide_pair(&mut self, x: i32, y: i32, codepoint: u32, fg: Rgba, bg: Rgba, attrs: Attrs, blend: bool) {
        self.clear_continuation_owner(x, y);
        self.clear_continuation_owner(x + 1, y);
        if let Some(i) = self.index(x, y) {
            let cell = if blend {
                let existing = self.cells[i];
                Cell { codepoint, fg: fg.blend_over(existing.fg), bg: bg.blend_over(existing.bg), attrs, width: CellWidth::Wide }
            } else {
                Cell { codepoint, fg, bg, attrs, width: CellWidth::Wide }
            };
            if self.in_clip(x, y) {
                self.cells[i] = cell;
            }
        }
        if let Some(i) = self.index(x + 1, y) {
            if self.in_clip(x + 1, y) {
                self.cells[i] = Cell::continuation(fg, bg, attrs);
            }
        }
    }

    /// `draw_text`: iterates grapheme clusters, measuring width via the buffer's
    /// width oracle. A width-2 cluster that can't fit at the current column
    /// (`c+2 > width`) is pushed to the next line, padding the skipped column with a
    /// space — the same wide-grapheme rule view-level wrapping applies.
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, fg: Rgba, bg: Option<Rgba>, attrs: Option<Attrs>) {
        let bg = bg.unwrap_or(Rgba::TRANSPARENT);
        let attrs = attrs.unwrap_or(Attrs::empty());
        let mut col = x;
        let mut row = y;
        for (cluster, w) in self.width_policy.segment(text) {
            if cluster == "\n" {
                row += 1;
                col = x;
                continue;
            }
            let w = w as i32;
            if w == 2 && (col + 2) > self.width as i32 {
                self.set_cell(col, row, ' ' as u32, fg, bg, attrs);
                row += 1;
                col = x;
            }
            let codepoint = cluster.chars().next().map_or(u32::from(' '), u32::from);
            if w == 2 {
                self.write_wide_pair(col, row, codepoint, fg, bg, attrs, false);
                col += 2;
            } else if w == 1 {
                self.set_cell(col, row, codepoint, fg, bg, attrs);
                col += 1;
            }
            // w == 0 (combining mark folded into the previous cluster by the
            // grapheme segmenter): nothing further to place.
        }
    }

    /// `draw_frame_buffer`: copies cells from `src`, respecting `src`'s
    /// `respect_alpha` flag; zero-alpha cells are skipped.
    pub fn draw_frame_buffer(&mut self, dst_x: i32, dst_y: i32, src: &OptimizedBuffer, src_rect: Option<SrcRect>) {
        let rect = src_rect.unwrap_or(SrcRect { x: 0, y: 0, w: src.width, h: src.height });
        for sy in 0..rect.h {
            for sx in 0..rect.w {
                let Some(cell) = src.get_cell((rect.x + sx) as i32, (rect.y + sy) as i32) else { continue };
                if cell.is_continuation() {
                    continue;
                }
                if cell.fg.a <= 0.0 && cell.bg.a <= 0.0 {
                    continue;
                }
                let dx = dst_x + sx as i32;
                let dy = dst_y + sy as i32;
                if src.respect_alpha {
                    self.set_cell_blend(dx, dy, cell.codepoint, cell.fg, cell.bg, cell.attrs);
                } else {
                    self.set_cell(dx, dy, cell.codepoint, cell.fg, cell.bg, cell.attrs);
                }
            }
        }
    }

    /// `draw_box`: draws up to four border edges plus an optional title
    /// on the top edge.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_box(&mut self, x: i32, y: i32, w: u32, h: u32, chars: BorderChars, options: BoxOptions, border_color: Rgba, bg: Rgba, title: Option<&str>) {
        if w == 0 || h == 0 {
            return;
        }
        let right = x + w_as_i32(w) - 1;
        let bottom = y + w_as_i32(h) - 1;

        if options.draw_top {
            self.set_cell(x, y, u32::from(chars.top_left), border_color, bg, Attrs::empty());
            for col in (x + 1)..right {
                self.set_cell(col, y, u32::from(chars.top), border_color, bg, Attrs::empty());
            }
            self.set_cell(right, y, u32::from(chars.top_right), border_color, bg, Attrs::empty());
            if let Some(title) = title {
                self.draw_text(title, x + 2, y, border_color, Some(bg), None);
            }
        }
        if options.draw_bottom {
            self.set_cell(x, bottom, u32::from(chars.bottom_left), border_color, bg, Attrs::empty());
            for col in (x + 1)..right {
                self.set_cell(col, bottom, u32::from(chars.bottom), border_color, bg, Attrs::empty());
            }
            self.set_cell(right, bottom, u32::from(chars.bottom_right), border_color, bg, Attrs::empty());
        }
        if options.draw_left {
            for row in (y + 1)..bottom {
                self.set_cell(x, row, u32::from(chars.left), border_color, bg, Attrs::empty());
            }
        }
        if options.draw_right {
            for row in (y + 1)..bottom {
                self.set_cell(right, row, u32::from(chars.right), border_color, bg, Attrs::empty());
            }
        }
    }

    /// `draw_packed_buffer`: `data` is a flat row-major array of
    /// `(codepoint, fg, bg, attrs)` tuples, `dims` is `(w, h)` of that array.
    pub fn draw_packed_buffer(&mut self, data: &[(u32, Rgba, Rgba, Attrs)], pos: (i32, i32), dims: (u32, u32)) {
        let (x, y) = pos;
        let (w, h) = dims;
        for row in 0..h {
            for col in 0..w {
                let idx = (row * w + col) as usize;
                let Some(&(cp, fg, bg, attrs)) = data.get(idx) else { continue };
                self.set_cell(x + col as i32, y + row as i32, cp, fg, bg, attrs);
            }
        }
    }

    /// `draw_super_sample_buffer`: downsamples a `2x`-oversampled packed
    /// buffer (e.g. sprite/particle output) into cell-sized blocks by averaging each
    /// 2x2 group of samples into one cell's color, using the upper-left sample's
    /// codepoint (super-sampling only refines color, not glyph choice, at this
    /// resolution).
    pub fn draw_super_sample_buffer(&mut self, data: &[(u32, Rgba, Rgba, Attrs)], pos: (i32, i32), sample_dims: (u32, u32)) {
        let (x, y) = pos;
        let (sw, sh) = sample_dims;
        let (cw, ch) = (sw / 2, sh / 2);
        for cy in 0..ch {
            for cx in 0..cw {
                let mut fg_acc = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
                let mut bg_acc = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
                let mut codepoint = u32::from(' ');
                let mut attrs = Attrs::empty();
                for (i, (sy, sx)) in [(0, 0), (0, 1), (1, 0), (1, 1)].into_iter().enumerate() {
                    let idx = ((cy * 2 + sy) * sw + (cx * 2 + sx)) as usize;
                    if let Some(&(cp, fg, bg, a)) = data.get(idx) {
                        fg_acc = (fg_acc.0 + fg.r, fg_acc.1 + fg.g, fg_acc.2 + fg.b, fg_acc.3 + fg.a);
                        bg_acc = (bg_acc.0 + bg.r, bg_acc.1 + bg.g, bg_acc.2 + bg.b, bg_acc.3 + bg.a);
                        if i == 0 {
                            codepoint = cp;
                            attrs = a;
                        }
                    }
                }
                let fg = Rgba::new(fg_acc.0 / 4.0, fg_acc.1 / 4.0, fg_acc.2 / 4.0, fg_acc.3 / 4.0);
                let bg = Rgba::new(bg_acc.0 / 4.0, bg_acc.1 / 4.0, bg_acc.2 / 4.0, bg_acc.3 / 4.0);
                self.set_cell(x + cx as i32, y + cy as i32, codepoint, fg, bg, attrs);
            }
        }
    }

    /// Allocates a new grid and copies the overlap region; cells outside the copy
    /// are cleared to the buffer's default background.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        let mut new_cells = vec![Cell::blank(Rgba::WHITE, self.default_bg); (new_width as usize) * (new_height as usize)];
        let copy_w = self.width.min(new_width);
        let copy_h = self.height.min(new_height);
        for row in 0..copy_h {
            for col in 0..copy_w {
                let src_i = row as usize * self.width as usize + col as usize;
                let dst_i = row as usize * new_width as usize + col as usize;
                new_cells[dst_i] = self.cells[src_i];
            }
        }
        self.width = new_width;
        self.height = new_height;
        self.cells = new_cells;
        self.scissors.clear();
    }

    /// Row-major iteration over every cell, used by the renderer's diff/encode pass.
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(i, c)| ((i as u32) % width, (i as u32) / width, c))
    }
}

impl std::fmt::Debug for OptimizedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizedBuffer").field("width", &self.width).field("height", &self.height).finish()
    }
}

fn w_as_i32(w: u32) -> i32 {
    w as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(w: u32, h: u32) -> OptimizedBuffer {
        OptimizedBuffer::new(w, h, WidthPolicy::Unicode)
    }

    #[test]
    fn writes_outside_grid_are_discarded() {
        let mut b = buf(5, 5);
        b.set_cell(100, 100, u32::from('x'), Rgba::WHITE, Rgba::BLACK, Attrs::empty());
        assert!(b.get_cell(100, 100).is_none());
    }

    #[test]
    fn wide_cluster_writes_continuation_sentinel() {
        let mut b = buf(5, 1);
        b.draw_text("中", 0, 0, Rgba::WHITE, None, None);
        let left = b.get_cell(0, 0).unwrap();
        let right = b.get_cell(1, 0).unwrap();
        assert_eq!(left.width, CellWidth::Wide);
        assert!(right.is_continuation());
    }

    #[test]
    fn set_cell_blend_composites_alpha() {
        let mut b = buf(3, 1);
        b.set_cell(0, 0, u32::from(' '), Rgba::TRANSPARENT, Rgba::BLACK, Attrs::empty());
        b.set_cell_blend(0, 0, u32::from('x'), Rgba::new(1.0, 1.0, 1.0, 0.5), Rgba::TRANSPARENT, Attrs::empty());
        let cell = b.get_cell(0, 0).unwrap();
        assert!((cell.fg.a - 0.5).abs() < 1e-6);
    }

    #[test]
    fn scissor_clips_writes_outside_region() {
        let mut b = buf(10, 10);
        b.push_scissor(0, 0, 3, 3);
        b.set_cell(5, 5, u32::from('x'), Rgba::WHITE, Rgba::BLACK, Attrs::empty());
        assert_eq!(b.get_cell(5, 5).unwrap().codepoint, u32::from(' '));
        b.set_cell(1, 1, u32::from('y'), Rgba::WHITE, Rgba::BLACK, Attrs::empty());
        assert_eq!(b.get_cell(1, 1).unwrap().codepoint, u32::from('y'));
        b.pop_scissor();
    }

    #[test]
    fn resize_preserves_overlap_and_clears_new_area() {
        let mut b = buf(2, 2);
        b.set_cell(0, 0, u32::from('a'), Rgba::WHITE, Rgba::BLACK, Attrs::empty());
        b.resize(4, 4);
        assert_eq!(b.get_cell(0, 0).unwrap().codepoint, u32::from('a'));
        assert_eq!(b.get_cell(3, 3).unwrap().codepoint, u32::from(' '));
    }

    #[test]
    fn destroyed_buffer_clears_cells() {
        let mut b = buf(2, 2);
        b.destroy();
        assert_eq!(b.cells.len(), 0);
        b.destroy(); // idempotent
    }

    #[test]
    fn draw_frame_buffer_skips_zero_alpha_cells() {
        let mut src = buf(2, 1);
        src.set_cell(0, 0, u32::from('a'), Rgba::WHITE, Rgba::TRANSPARENT, Attrs::empty());
        // Cell 1,0 stays default (transparent fg+bg) — should be skipped on copy.
        let mut dst = buf(2, 1);
        dst.set_cell(1, 0, u32::from('z'), Rgba::WHITE, Rgba::BLACK, Attrs::empty());
        dst.draw_frame_buffer(0, 0, &src, None);
        assert_eq!(dst.get_cell(1, 0).unwrap().codepoint, u32::from('z'));
    }
}
