// Licensed under the Apache License, Version 2.0. See LICENSE.

//! `TextBuffer`: wraps the rope, adds styled-chunk metadata, per-line
//! highlight intervals, and a named-style palette reference.

pub mod highlight;
pub mod style;

use std::ops::Range;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::cell::{Attrs, Rgba};
use crate::coords::Row;
use crate::error::{CoreError, CoreResult};
use crate::mem_registry::{MemId, MemRegistry};
use crate::rope::Rope;
use crate::width::WidthPolicy;

pub use highlight::{Highlight, LineHighlights};
pub use style::{StyleId, StyleOverride, SyntaxPalette, TextChunk};

/// A destroyable handle's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Live,
    Destroyed,
}

/// Text storage with styled chunks, per-line highlight intervals, and a shared
/// syntax-style palette reference.
pub struct TextBuffer {
    rope: Rope,
    mem: MemRegistry,
    styled_chunks: Vec<style::StyledChunk>,
    highlights: FxHashMap<usize, LineHighlights>,
    next_highlight_seq: u64,
    default_fg: Rgba,
    default_bg: Rgba,
    default_attrs: Attrs,
    palette: SyntaxPalette,
    width_policy: WidthPolicy,
    lifecycle: Lifecycle,
    /// Bumped on every content mutation; `TextBufferView`'s wrap cache keys off this
    ///.
    version: u64,
}

impl TextBuffer {
    #[must_use]
    pub fn new(width_policy: WidthPolicy) -> Self {
        Self {
            rope: Rope::new(width_policy),
            mem: MemRegistry::new(),
            styled_chunks: Vec::new(),
            highlights: FxHashMap::default(),
            next_highlight_seq: 0,
            default_fg: Rgba::WHITE,
            default_bg: Rgba::TRANSPARENT,
            default_attrs: Attrs::empty(),
            palette: SyntaxPalette::new(),
            width_policy,
            lifecycle: Lifecycle::Live,
            version: 0,
        }
    }

    /// Monotonically increasing content version; views use this to decide whether
    /// their cached wrap structure is stale.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    fn check_live(&self) -> CoreResult<()> {
        if self.lifecycle == Lifecycle::Destroyed {
            Err(CoreError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Idempotent; releases native memory. Further method calls fail with
    /// `CoreError::Destroyed`.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.mem.clear();
        self.styled_chunks.clear();
        self.highlights.clear();
        self.lifecycle = Lifecycle::Destroyed;
    }

    #[must_use]
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Low-level splice for callers (namely `EditBuffer`) that edit the rope in
    /// place rather than replacing the whole document. Drops styled chunks since
    /// their char-offset ranges would no longer line up with the edited text;
    /// highlights are left as-is: they key off `(line, col)`, which `EditBuffer`
    /// re-derives after every edit anyway.
    pub(crate) fn splice_raw(&mut self, range: Range<usize>, bytes: &[u8]) -> CoreResult<()> {
        self.check_live()?;
        self.styled_chunks.clear();
        self.rope.splice(range, bytes);
        self.version += 1;
        Ok(())
    }

    #[must_use]
    pub fn width_policy(&self) -> WidthPolicy {
        self.width_policy
    }

    /// `set_text`: with `reset_history=true`, wipes the mem-registry (and
    /// thus undo history built on top, at the `EditBuffer` layer); with `false`,
    /// registers the new bytes as a new region without discarding the old ones.
    pub fn set_text(&mut self, bytes: &[u8], reset_history: bool) -> CoreResult<()> {
        self.check_live()?;
        if reset_history {
            self.mem.clear();
            self.rope = Rope::new(self.width_policy);
        }
        let id = self.mem.register(bytes.to_vec(), true);
        self.rope = Rope::from_bytes(bytes, true, self.width_policy);
        self.styled_chunks.clear();
        let _ = id; // registered for lifetime-tracking parity with replace_mem_buffer
        self.version += 1;
        Ok(())
    }

    /// `replace_mem_buffer`: registers `bytes` under `mem_id` semantics,
    /// replacing the rope's content but not touching highlight ref-tags.
    pub fn replace_mem_buffer(&mut self, bytes: &[u8], owned: bool) -> CoreResult<MemId> {
        self.check_live()?;
        let id = self.mem.register(bytes.to_vec(), owned);
        self.rope = Rope::from_bytes(bytes, owned, self.width_policy);
        self.version += 1;
        Ok(id)
    }

    /// `append`: CRLF-normalized, does not re-segment graphemes across the
    /// append boundary.
    pub fn append(&mut self, bytes: &[u8]) -> CoreResult<()> {
        self.check_live()?;
        self.rope.append(bytes);
        self.version += 1;
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        self.check_live()?;
        let bytes = std::fs::read(path)?;
        self.mem.register(bytes.clone(), true);
        self.rope = Rope::from_bytes(&bytes, true, self.width_policy);
        self.styled_chunks.clear();
        self.version += 1;
        Ok(())
    }

    /// `set_styled_text`: replaces the entire text with the concatenation
    /// of `chunks`, each becoming a styled range over the resulting char offsets.
    pub fn set_styled_text(&mut self, chunks: &[TextChunk]) -> CoreResult<()> {
        self.check_live()?;
        let mut concat = String::new();
        let mut ranges = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let start = concat.chars().count();
            concat.push_str(&chunk.text);
            let end = concat.chars().count();
            ranges.push(style::StyledChunk { start, end, style: chunk.style });
        }
        self.rope = Rope::from_bytes(concat.as_bytes(), true, self.width_policy);
        self.mem.register(concat.into_bytes(), true);
        self.styled_chunks = ranges;
        self.version += 1;
        Ok(())
    }

    pub fn set_default_fg(&mut self, fg: Rgba) {
        self.default_fg = fg;
    }

    pub fn set_default_bg(&mut self, bg: Rgba) {
        self.default_bg = bg;
    }

    pub fn set_default_attrs(&mut self, attrs: Attrs) {
        self.default_attrs = attrs;
    }

    #[must_use]
    pub fn default_style(&self) -> StyleOverride {
        StyleOverride { fg: Some(self.default_fg), bg: Some(self.default_bg), attrs: Some(self.default_attrs) }
    }

    /// Resolves the style in effect at char offset `at`, layering a matching styled
    /// chunk (if any) over the buffer defaults.
    #[must_use]
    pub fn style_at(&self, at: usize) -> StyleOverride {
        let base = self.default_style();
        let Some(chunk) = self.styled_chunks.iter().find(|c| at >= c.start && at < c.end) else {
            return base;
        };
        StyleOverride {
            fg: chunk.style.fg.or(base.fg),
            bg: chunk.style.bg.or(base.bg),
            attrs: chunk.style.attrs.or(base.attrs),
        }
    }

    /// `clear`: empties contents; highlight ref-tag mappings are dropped
    /// from the live index (callers re-apply via `ref_tag` after re-populating).
    pub fn clear(&mut self) -> CoreResult<()> {
        self.check_live()?;
        self.rope = Rope::new(self.width_policy);
        self.styled_chunks.clear();
        self.highlights.clear();
        self.version += 1;
        Ok(())
    }

    /// `reset`: additionally drops the mem-registry and default styles.
    pub fn reset(&mut self) -> CoreResult<()> {
        self.clear()?;
        self.mem.clear();
        self.default_fg = Rgba::WHITE;
        self.default_bg = Rgba::TRANSPARENT;
        self.default_attrs = Attrs::empty();
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_highlight_seq;
        self.next_highlight_seq += 1;
        seq
    }

    pub fn add_highlight(
        &mut self,
        line: Row,
        col_start: usize,
        col_end: usize,
        style_id: StyleId,
        priority: i32,
        ref_tag: Option<String>,
    ) -> CoreResult<()> {
        self.check_live()?;
        let seq = self.next_seq();
        self.highlights.entry(line.as_usize()).or_default().insert(Highlight {
            col_start,
            col_end,
            style_id,
            priority,
            ref_tag,
            seq,
        });
        Ok(())
    }

    /// `add_highlight_by_char_range`: converts a char-offset range to
    /// `(line, col_start, col_end)` via the rope before delegating to
    /// [`TextBuffer::add_highlight`].
    pub fn add_highlight_by_char_range(
        &mut self,
        start: usize,
        end: usize,
        style_id: StyleId,
        priority: i32,
        ref_tag: Option<String>,
    ) -> CoreResult<()> {
        self.check_live()?;
        let Some((row, col_start)) = self.rope.offset_to_position(crate::coords::CharOffset(start)) else {
            return Err(CoreError::OutOfBounds(format!("char offset {start} out of range")));
        };
        let Some((_, col_end)) = self.rope.offset_to_position(crate::coords::CharOffset(end)) else {
            return Err(CoreError::OutOfBounds(format!("char offset {end} out of range")));
        };
        self.add_highlight(row, col_start, col_end, style_id, priority, ref_tag)
    }

    pub fn remove_highlights_by_ref(&mut self, ref_tag: &str) {
        for line in self.highlights.values_mut() {
            line.remove_by_ref(ref_tag);
        }
    }

    pub fn clear_line_highlights(&mut self, line: Row) {
        if let Some(lh) = self.highlights.get_mut(&line.as_usize()) {
            lh.clear();
        }
    }

    pub fn clear_all_highlights(&mut self) {
        self.highlights.clear();
    }

    pub fn set_syntax_style(&mut self, palette: Option<SyntaxPalette>) {
        self.palette = palette.unwrap_or_default();
    }

    #[must_use]
    pub fn palette(&self) -> &SyntaxPalette {
        &self.palette
    }

    #[must_use]
    pub fn get_line_highlights(&self, line: Row) -> Vec<Highlight> {
        self.highlights.get(&line.as_usize()).map(|lh| lh.entries().to_vec()).unwrap_or_default()
    }

    /// `get_plain_text`: truncates to at most `max_len` chars.
    #[must_use]
    pub fn get_plain_text(&self, max_len: Option<usize>) -> String {
        let text = self.rope.substring(0..self.rope.len_chars());
        match max_len {
            Some(n) => text.chars().take(n).collect(),
            None => text,
        }
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer").field("chars", &self.rope.len_chars()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_text_roundtrips() {
        let mut tb = TextBuffer::new(WidthPolicy::Unicode);
        tb.set_text(b"Hello\nWorld", true).unwrap();
        assert_eq!(tb.get_plain_text(None), "Hello\nWorld");
    }

    #[test]
    fn set_text_reset_history_clears_mem_registry() {
        let mut tb = TextBuffer::new(WidthPolicy::Unicode);
        tb.set_text(b"a", true).unwrap();
        tb.set_text(b"b", false).unwrap();
        assert_eq!(tb.mem.len(), 1);
        tb.set_text(b"c", true).unwrap();
        assert_eq!(tb.mem.len(), 1);
    }

    #[test]
    fn set_styled_text_concatenates_and_get_plain_text_matches() {
        let mut tb = TextBuffer::new(WidthPolicy::Unicode);
        let chunks = vec![
            TextChunk { text: "Hello ".into(), style: StyleOverride::default() },
            TextChunk { text: "World".into(), style: StyleOverride { fg: Some(Rgba::BLACK), ..Default::default() } },
        ];
        tb.set_styled_text(&chunks).unwrap();
        assert_eq!(tb.get_plain_text(None), "Hello World");
        assert_eq!(tb.style_at(7).fg, Some(Rgba::BLACK));
        assert_eq!(tb.style_at(0).fg, Some(Rgba::WHITE));
    }

    #[test]
    fn highlight_overlap_resolution() {
        let mut tb = TextBuffer::new(WidthPolicy::Unicode);
        tb.set_text(b"hello world", true).unwrap();
        tb.add_highlight(Row(0), 0, 11, 1, 1, None).unwrap();
        tb.add_highlight(Row(0), 6, 11, 2, 5, Some("lsp".into())).unwrap();
        let entries = tb.get_line_highlights(Row(0));
        assert_eq!(entries.len(), 2);
        tb.remove_highlights_by_ref("lsp");
        assert_eq!(tb.get_line_highlights(Row(0)).len(), 1);
    }

    #[test]
    fn destroyed_handle_fails_loudly() {
        let mut tb = TextBuffer::new(WidthPolicy::Unicode);
        tb.destroy();
        assert!(matches!(tb.append(b"x"), Err(CoreError::Destroyed)));
        tb.destroy(); // idempotent
    }

    #[test]
    fn reset_drops_defaults_and_mem_registry() {
        let mut tb = TextBuffer::new(WidthPolicy::Unicode);
        tb.set_default_fg(Rgba::BLACK);
        tb.set_text(b"hi", true).unwrap();
        tb.reset().unwrap();
        assert_eq!(tb.get_plain_text(None), "");
        assert_eq!(tb.default_style().fg, Some(Rgba::WHITE));
    }
}
