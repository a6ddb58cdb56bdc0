// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Per-line highlight intervals.

use super::style::StyleId;

/// A highlighted display-column range on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub col_start: usize,
    pub col_end: usize,
    pub style_id: StyleId,
    pub priority: i32,
    pub ref_tag: Option<String>,
    /// Monotonic insertion order, used to break priority ties: later-added wins.
    pub(crate) seq: u64,
}

/// Sorted-by-`(col_start, priority desc)` list of highlights on one line.
/// Overlapping highlights resolve by higher priority, ties broken by later-added.
#[derive(Debug, Clone, Default)]
pub struct LineHighlights {
    entries: Vec<Highlight>,
}

impl LineHighlights {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, h: Highlight) {
        let pos = self
            .entries
            .partition_point(|e| (e.col_start, std::cmp::Reverse(e.priority)) <= (h.col_start, std::cmp::Reverse(h.priority)));
        self.entries.insert(pos, h);
    }

    #[must_use]
    pub fn entries(&self) -> &[Highlight] {
        &self.entries
    }

    pub fn remove_by_ref(&mut self, ref_tag: &str) {
        self.entries.retain(|h| h.ref_tag.as_deref() != Some(ref_tag));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resolves the winning highlight (if any) covering display column `col`:
    /// highest priority first, later-added breaking ties.
    #[must_use]
    pub fn winner_at(&self, col: usize) -> Option<&Highlight> {
        self.entries
            .iter()
            .filter(|h| col >= h.col_start && col < h.col_end)
            .max_by_key(|h| (h.priority, h.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(col_start: usize, col_end: usize, priority: i32, seq: u64) -> Highlight {
        Highlight { col_start, col_end, style_id: 0, priority, ref_tag: None, seq }
    }

    #[test]
    fn sorted_by_col_start_then_priority_desc() {
        let mut lh = LineHighlights::new();
        lh.insert(h(5, 10, 1, 0));
        lh.insert(h(0, 3, 5, 1));
        lh.insert(h(0, 3, 9, 2));
        let cols: Vec<_> = lh.entries().iter().map(|e| (e.col_start, e.priority)).collect();
        assert_eq!(cols, vec![(0, 9), (0, 5), (5, 1)]);
    }

    #[test]
    fn higher_priority_wins_overlap() {
        let mut lh = LineHighlights::new();
        lh.insert(h(0, 10, 1, 0));
        lh.insert(h(5, 8, 9, 1));
        let winner = lh.winner_at(6).unwrap();
        assert_eq!(winner.priority, 9);
    }

    #[test]
    fn later_added_breaks_priority_tie() {
        let mut lh = LineHighlights::new();
        lh.insert(h(0, 10, 5, 0));
        lh.insert(h(0, 10, 5, 1));
        let winner = lh.winner_at(3).unwrap();
        assert_eq!(winner.seq, 1);
    }

    #[test]
    fn remove_by_ref_tag() {
        let mut lh = LineHighlights::new();
        lh.insert(Highlight { col_start: 0, col_end: 5, style_id: 0, priority: 1, ref_tag: Some("lsp".into()), seq: 0 });
        lh.remove_by_ref("lsp");
        assert!(lh.entries().is_empty());
    }
}
