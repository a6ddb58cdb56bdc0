// Licensed under the Apache License, Version 2.0. See LICENSE.

//! The rope / piece-table. Each leaf ("piece") refers to an
//! immutable memory region rather than owning a private copy, so `splice` never
//! copies the surrounding, unchanged text — only the edited range's pieces are
//! replaced.
//!
//! This implementation keeps pieces in a flat `Vec` rather than a balanced tree.
//! That makes `splice`/`walk` `O(piece count)` instead of the `O(log n)` a balanced
//! rope gets; DESIGN.md records this as a deliberate scope trade-off (a persistent
//! balanced rope tree is a project on its own). Correctness of the offset math does
//! not depend on the tree shape, only on pieces being walked in order, which a `Vec`
//! guarantees trivially.

use std::sync::Arc;

use crate::coords::{ByteOffset, CharOffset, Row};
use crate::width::WidthPolicy;

/// Identifies the memory region (or "buf_id") a piece's text was sliced from — an
/// "original" region (file/external bytes) or an "add" region (text appended by the
/// core itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufId(pub u64);

struct Piece {
    buf_id: BufId,
    /// Decoded, CRLF-normalized text of the *entire* region this piece was sliced
    /// from (pieces from the same `append` call share one `Arc<str>`).
    region: Arc<str>,
    /// Char offset into `region` where this piece begins.
    start_char: usize,
    /// Number of chars (Unicode scalar values) this piece covers.
    len_chars: usize,
    // Cached per-leaf metadata.
    display_width: usize,
    newline_count: usize,
}

impl Piece {
    fn as_str(&self) -> &str {
        char_slice(&self.region, self.start_char, self.start_char + self.len_chars)
    }
}

/// Returns the substring of `s` covering char indices `[start, end)`.
fn char_slice(s: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let mut iter = s.char_indices();
    let byte_start = iter.clone().nth(start).map(|(b, _)| b).unwrap_or(s.len());
    let byte_end = iter.nth(end - 1).map(|(b, c)| b + c.len_utf8()).unwrap_or(s.len());
    &s[byte_start..byte_end]
}

/// Decodes `bytes` as UTF-8, substituting U+FFFD for malformed sequences, then normalizes
/// CRLF to LF in the logical stream.
fn decode_and_normalize(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    decoded.replace("\r\n", "\n")
}

/// A piece-table text store keyed by char offset (splice/substring) and by
/// `(row, display-col)` (line navigation).
pub struct Rope {
    pieces: Vec<Piece>,
    next_buf_id: u64,
    width_policy: WidthPolicy,
    total_chars: usize,
    total_bytes: usize,
    total_newlines: usize,
}

impl Rope {
    #[must_use]
    pub fn new(width_policy: WidthPolicy) -> Self {
        Self {
            pieces: Vec::new(),
            next_buf_id: 0,
            width_policy,
            total_chars: 0,
            total_bytes: 0,
            total_newlines: 0,
        }
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8], owned: bool, width_policy: WidthPolicy) -> Self {
        let mut rope = Self::new(width_policy);
        rope.ingest(bytes, owned);
        rope
    }

    fn alloc_buf_id(&mut self) -> BufId {
        let id = BufId(self.next_buf_id);
        self.next_buf_id += 1;
        id
    }

    fn ingest(&mut self, bytes: &[u8], _owned: bool) {
        let text = decode_and_normalize(bytes);
        if text.is_empty() {
            return;
        }
        let buf_id = self.alloc_buf_id();
        let region: Arc<str> = Arc::from(text.as_str());
        let len_chars = region.chars().count();
        let display_width = self.width_policy.str_width(&region);
        let newline_count = region.matches('\n').count();
        self.total_chars += len_chars;
        self.total_bytes += region.len();
        self.total_newlines += newline_count;
        self.pieces.push(Piece {
            buf_id,
            region,
            start_char: 0,
            len_chars,
            display_width,
            newline_count,
        });
    }

    /// Appends `bytes` as a new piece: CRLF-normalized,
    /// registered as a brand new region. Does not re-segment graphemes across the
    /// append boundary.
    pub fn append(&mut self, bytes: &[u8]) {
        self.ingest(bytes, true);
    }

    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.total_chars
    }

    /// Byte-size counter "for allocation sizing only" —
    /// callers must not treat this as an offset unit.
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.total_bytes
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.total_newlines + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_chars == 0
    }

    /// Visits each piece once, in order, as `(text_slice, has_trailing_break)` — a
    /// single in-order traversal callers build line/segment iteration on top of.
    /// `has_trailing_break` is true when the piece's own text ends in a line break.
    pub fn walk(&self, mut visitor: impl FnMut(&str, bool)) {
        for piece in &self.pieces {
            let s = piece.as_str();
            visitor(s, s.ends_with('\n'));
        }
    }

    /// Concatenation of every piece's text — `O(piece count)`, used by
    /// `substring`/`get_plain_text`-style callers that need the whole buffer.
    #[must_use]
    fn full_text(&self) -> String {
        let mut out = String::with_capacity(self.total_bytes);
        self.walk(|s, _| out.push_str(s));
        out
    }

    /// Returns the substring spanning char range `[start, end)`.
    #[must_use]
    pub fn substring(&self, range: std::ops::Range<usize>) -> String {
        let mut out = String::new();
        let mut consumed = 0usize;
        for piece in &self.pieces {
            let piece_start = consumed;
            let piece_end = consumed + piece.len_chars;
            consumed = piece_end;
            if piece_end <= range.start || piece_start >= range.end {
                continue;
            }
            let lo = range.start.max(piece_start) - piece_start;
            let hi = range.end.min(piece_end) - piece_start;
            out.push_str(char_slice(piece.as_str(), lo, hi));
        }
        out
    }

    /// Replaces char range `range` with `bytes` (CRLF-normalized, decoded the same
    /// way `append` decodes). `range` may be empty (pure insert) or may cover the
    /// whole buffer (pure delete when `bytes` is empty).
    pub fn splice(&mut self, range: std::ops::Range<usize>, bytes: &[u8]) {
        let range = range.start.min(self.total_chars)..range.end.min(self.total_chars);
        let mut new_pieces = Vec::with_capacity(self.pieces.len() + 1);
        let mut consumed = 0usize;
        let mut removed_chars = 0usize;
        let mut removed_newlines = 0usize;
        let mut removed_width = 0usize;

        for piece in self.pieces.drain(..) {
            let piece_start = consumed;
            let piece_end = consumed + piece.len_chars;
            consumed = piece_end;

            if piece_end <= range.start || piece_start >= range.end {
                new_pieces.push(piece);
                continue;
            }

            // Keep the part of this piece before the spliced range, if any.
            if piece_start < range.start {
                let keep_len = range.start - piece_start;
                let kept = slice_piece(&piece, 0, keep_len, self.width_policy);
                new_pieces.push(kept);
            }

            // Track what's being removed for the running totals.
            let cut_lo = range.start.max(piece_start) - piece_start;
            let cut_hi = range.end.min(piece_end) - piece_start;
            let removed_str = char_slice(piece.as_str(), cut_lo, cut_hi);
            removed_chars += cut_hi - cut_lo;
            removed_newlines += removed_str.matches('\n').count();
            removed_width += self.width_policy.str_width(removed_str);

            // Keep the part of this piece after the spliced range, if any. The
            // insertion point (new piece for `bytes`) is spliced in once, right
            // after the first piece we cut into.
            if piece_end > range.end {
                let keep_from = range.end.max(piece_start) - piece_start;
                let kept = slice_piece(&piece, keep_from, piece.len_chars, self.width_policy);
                // Insert the new text before the remainder of this piece.
                if !bytes.is_empty() {
                    push_new_piece(&mut new_pieces, bytes, &mut self.next_buf_id, self.width_policy);
                    self.insert_inline_accounting(bytes);
                }
                new_pieces.push(kept);
                self.pieces = new_pieces;
                self.total_chars = self.total_chars - removed_chars;
                self.total_newlines = self.total_newlines - removed_newlines;
                self.total_bytes = self.pieces.iter().map(|p| p.as_str().len()).sum();
                return;
            }
        }

        // The spliced range reached (or was at) the end of the buffer; append the
        // new text, if any, at the tail.
        if !bytes.is_empty() {
            push_new_piece(&mut new_pieces, bytes, &mut self.next_buf_id, self.width_policy);
            self.insert_inline_accounting(bytes);
        }
        self.pieces = new_pieces;
        self.total_chars -= removed_chars;
        self.total_newlines -= removed_newlines;
        let _ = removed_width;
        self.total_bytes = self.pieces.iter().map(|p| p.as_str().len()).sum();
    }

    fn insert_inline_accounting(&mut self, bytes: &[u8]) {
        let text = decode_and_normalize(bytes);
        self.total_chars += text.chars().count();
        self.total_newlines += text.matches('\n').count();
    }

    /// Char offset of the start of `row`. Out-of-range rows clamp to the last
    /// line's start.
    #[must_use]
    pub fn line_start_offset(&self, row: Row) -> CharOffset {
        let text = self.full_text();
        let mut current_row = 0usize;
        if row.as_usize() == 0 {
            return CharOffset(0);
        }
        for (idx, ch) in text.chars().enumerate() {
            if ch == '\n' {
                current_row += 1;
                if current_row == row.as_usize() {
                    return CharOffset(idx + 1);
                }
            }
        }
        // Clamp: row beyond the last line starts at the last line's start.
        CharOffset(last_line_start_char(&text))
    }

    /// `(row, display_col) -> char offset`. Clamps row/col into range.
    #[must_use]
    pub fn position_to_offset(&self, row: Row, display_col: usize) -> CharOffset {
        let text = self.full_text();
        let line_start = self.line_start_offset(row).as_usize();
        let line_end = next_line_break_char(&text, line_start);
        let line = char_slice(&text, line_start, line_end);
        let mut width_so_far = 0usize;
        let mut chars_consumed = 0usize;
        for (cluster, w) in self.width_policy.segment(line) {
            if width_so_far >= display_col {
                break;
            }
            width_so_far += w as usize;
            chars_consumed += cluster.chars().count();
        }
        CharOffset(line_start + chars_consumed)
    }

    /// `char offset -> (row, display_col)`. Round-trips with `position_to_offset`
    /// when `col` lands on a grapheme boundary.
    #[must_use]
    pub fn offset_to_position(&self, offset: CharOffset) -> Option<(Row, usize)> {
        if offset.as_usize() > self.total_chars {
            return None;
        }
        let text = self.full_text();
        let clamped = offset.as_usize().min(text.chars().count());
        let mut row = 0usize;
        let mut line_start = 0usize;
        for (idx, ch) in text.chars().enumerate() {
            if idx == clamped {
                break;
            }
            if ch == '\n' {
                row += 1;
                line_start = idx + 1;
            }
        }
        let line = char_slice(&text, line_start, clamped);
        let col = self.width_policy.str_width(line);
        Some((Row(row), col))
    }
}

fn last_line_start_char(text: &str) -> usize {
    let mut start = 0usize;
    for (idx, ch) in text.chars().enumerate() {
        if ch == '\n' {
            start = idx + 1;
        }
    }
    start
}

fn next_line_break_char(text: &str, from_char: usize) -> usize {
    let mut idx = from_char;
    for ch in text.chars().skip(from_char) {
        if ch == '\n' {
            return idx;
        }
        idx += 1;
    }
    idx
}

fn slice_piece(piece: &Piece, lo: usize, hi: usize, width_policy: WidthPolicy) -> Piece {
    let s = char_slice(piece.as_str(), lo, hi);
    Piece {
        buf_id: piece.buf_id,
        region: Arc::from(s),
        start_char: 0,
        len_chars: hi - lo,
        display_width: width_policy.str_width(s),
        newline_count: s.matches('\n').count(),
    }
}

fn push_new_piece(pieces: &mut Vec<Piece>, bytes: &[u8], next_buf_id: &mut u64, width_policy: WidthPolicy) {
    let text = decode_and_normalize(bytes);
    if text.is_empty() {
        return;
    }
    let buf_id = BufId(*next_buf_id);
    *next_buf_id += 1;
    let region: Arc<str> = Arc::from(text.as_str());
    let len_chars = region.chars().count();
    pieces.push(Piece {
        buf_id,
        display_width: width_policy.str_width(&region),
        newline_count: region.matches('\n').count(),
        region,
        start_char: 0,
        len_chars,
    });
}

impl std::fmt::Debug for Rope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rope")
            .field("pieces", &self.pieces.len())
            .field("total_chars", &self.total_chars)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rope_of(s: &str) -> Rope {
        Rope::from_bytes(s.as_bytes(), true, WidthPolicy::Unicode)
    }

    #[test]
    fn from_bytes_roundtrips() {
        let rope = rope_of("Hello\nWorld");
        assert_eq!(rope.substring(0..rope.len_chars()), "Hello\nWorld");
        assert_eq!(rope.line_count(), 2);
    }

    #[test]
    fn crlf_is_normalized_to_lf() {
        let rope = Rope::from_bytes(b"a\r\nb", true, WidthPolicy::Unicode);
        assert_eq!(rope.substring(0..rope.len_chars()), "a\nb");
    }

    #[test]
    fn splice_insert_in_middle() {
        let mut rope = rope_of("Hello World");
        rope.splice(5..5, b" Cruel");
        assert_eq!(rope.substring(0..rope.len_chars()), "Hello Cruel World");
    }

    #[test]
    fn splice_delete_range() {
        let mut rope = rope_of("Hello Cruel World");
        rope.splice(5..11, b"");
        assert_eq!(rope.substring(0..rope.len_chars()), "Hello World");
    }

    #[test]
    fn splice_replace_range() {
        let mut rope = rope_of("Hello World");
        rope.splice(6..11, b"Rust!");
        assert_eq!(rope.substring(0..rope.len_chars()), "Hello Rust!");
    }

    #[test]
    fn line_starts_are_newline_aware() {
        let rope = rope_of("Hello\nWorld");
        assert_eq!(rope.line_start_offset(Row(0)).as_usize(), 0);
        assert_eq!(rope.line_start_offset(Row(1)).as_usize(), 6);
    }

    #[test]
    fn position_offset_roundtrip() {
        let rope = rope_of("Hello\nWorld");
        let off = rope.position_to_offset(Row(1), 3);
        assert_eq!(off.as_usize(), 9); // "Hello\n" (6) + "Wor" (3)
        let (row, col) = rope.offset_to_position(off).unwrap();
        assert_eq!(row, Row(1));
        assert_eq!(col, 3);
    }

    #[test]
    fn empty_rope_has_one_line() {
        let rope = Rope::new(WidthPolicy::Unicode);
        assert_eq!(rope.line_count(), 1);
        assert_eq!(rope.line_start_offset(Row(0)).as_usize(), 0);
    }

    #[test]
    fn walk_visits_each_piece_once() {
        let mut rope = rope_of("abc");
        rope.append(b"def");
        let mut segments = Vec::new();
        rope.walk(|s, _| segments.push(s.to_string()));
        assert_eq!(segments, vec!["abc".to_string(), "def".to_string()]);
    }

    #[test]
    fn out_of_range_line_start_clamps_to_last_line() {
        let rope = rope_of("a\nb");
        assert_eq!(rope.line_start_offset(Row(50)).as_usize(), 2);
    }
}
