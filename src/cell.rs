// Licensed under the Apache License, Version 2.0. See LICENSE.

//! The grid's atomic unit plus the straight-alpha blend math used by
//! `set_cell_blend` and `draw_frame_buffer`.

use bitflags::bitflags;

bitflags! {
    /// SGR attribute bits, packed into a `u8` rather than a struct of `Option<()>`
    /// fields: the grid stores one per cell, and a struct-of-options would be
    /// larger than a byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attrs: u8 {
        const BOLD          = 0b0000_0001;
        const ITALIC        = 0b0000_0010;
        const UNDERLINE     = 0b0000_0100;
        const DIM           = 0b0000_1000;
        const STRIKETHROUGH = 0b0001_0000;
        const INVERSE       = 0b0010_0000;
        const BLINK         = 0b0100_0000;
    }
}

/// Straight-alpha RGBA color, four `f32` lanes in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const BLACK: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Rgba = Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0, 1.0)
    }

    /// Straight-alpha "over" compositing:
    /// `out = src·α + dst·(1−α)`, `α_out = α_src + α_dst·(1−α_src)`.
    #[must_use]
    pub fn blend_over(self, dst: Rgba) -> Rgba {
        let a_src = self.a;
        let a_dst = dst.a;
        let a_out = a_src + a_dst * (1.0 - a_src);
        if a_out <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        // Premultiply-then-unpremultiply so the RGB lanes are correctly weighted
        // when the destination is itself partially transparent.
        let mix = |s: f32, d: f32| (s * a_src + d * a_dst * (1.0 - a_src)) / a_out;
        Rgba::new(mix(self.r, dst.r), mix(self.g, dst.g), mix(self.b, dst.b), a_out)
    }

    #[must_use]
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let conv = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (conv(self.r), conv(self.g), conv(self.b))
    }
}

/// Display width of a cell: 0 (continuation/zero-width), 1, or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CellWidth {
    #[default]
    Narrow = 1,
    Wide = 2,
    /// The right half of a wide cluster — a continuation sentinel, never drawn
    /// directly.
    Continuation = 0,
}

/// One grid position. A width-2 cluster occupies two adjacent cells:
/// the left one carries the real codepoint/width, the right one is a `Continuation`
/// sentinel sharing the left cell's attrs/colors so a diff-scan of unchanged runs
/// doesn't need to special-case "the right half of a wide char."
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub codepoint: u32,
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attrs,
    pub width: CellWidth,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Rgba::TRANSPARENT, Rgba::TRANSPARENT)
    }
}

impl Cell {
    #[must_use]
    pub fn blank(fg: Rgba, bg: Rgba) -> Self {
        Self { codepoint: u32::from(' '), fg, bg, attrs: Attrs::empty(), width: CellWidth::Narrow }
    }

    #[must_use]
    pub fn continuation(fg: Rgba, bg: Rgba, attrs: Attrs) -> Self {
        Self { codepoint: 0, fg, bg, attrs, width: CellWidth::Continuation }
    }

    #[must_use]
    pub fn is_continuation(&self) -> bool {
        matches!(self.width, CellWidth::Continuation)
    }

    /// Same `(fg, bg, attrs)` as `other` — the run-length predicate the flush
    /// encoder uses to group a run of consecutive cells under one SGR prefix.
    #[must_use]
    pub fn same_style(&self, other: &Cell) -> bool {
        self.fg == other.fg && self.bg == other.bg && self.attrs == other.attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_opaque_over_anything_is_opaque_src() {
        let src = Rgba::new(1.0, 0.0, 0.0, 1.0);
        let dst = Rgba::new(0.0, 1.0, 0.0, 1.0);
        let out = src.blend_over(dst);
        assert_eq!(out, Rgba::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn blend_half_alpha_mixes() {
        let src = Rgba::new(1.0, 0.0, 0.0, 0.5);
        let dst = Rgba::new(0.0, 0.0, 0.0, 1.0);
        let out = src.blend_over(dst);
        assert!((out.r - 0.5).abs() < 1e-6);
        assert!((out.a - 1.0).abs() < 1e-6);
    }

    #[test]
    fn blend_zero_alpha_src_over_transparent_is_transparent() {
        let src = Rgba::TRANSPARENT;
        let dst = Rgba::TRANSPARENT;
        assert_eq!(src.blend_over(dst), Rgba::TRANSPARENT);
    }
}
