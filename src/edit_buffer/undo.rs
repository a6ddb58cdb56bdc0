// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Undo/redo journal. Entries carry full before/after text snapshots rather than
//! diffs, the simplest representation that satisfies reversible
//! `{before_snapshot, after_snapshot}` edits without a diff/patch format.

use std::time::{Duration, Instant};

use super::cursor::CursorPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
    Replace,
}

impl EditKind {
    fn meta_word(self) -> &'static str {
        match self {
            EditKind::Insert => "insert",
            EditKind::Delete => "delete",
            EditKind::Replace => "replace",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub kind: EditKind,
    pub range: std::ops::Range<usize>,
    pub before_snapshot: String,
    pub after_snapshot: String,
    pub cursor_before: CursorPos,
    pub cursor_after: CursorPos,
    pub seq: u64,
}

impl UndoEntry {
    /// The opaque meta string `undo`/`redo` return, describing the restored edit
    ///.
    #[must_use]
    pub fn meta(&self) -> String {
        format!("{}@{}..{}", self.kind.meta_word(), self.range.start, self.range.end)
    }
}

struct PendingSession {
    kind: EditKind,
    started_at: Instant,
    last_at: Instant,
}

/// Owns the undo/redo stacks and the open coalescing session.
///
/// Open question: "Exact coalesce window for undo sessions (source
/// suggests time-based but also hints at cursor-jump-based)." Resolved in
/// DESIGN.md: we coalesce same-kind edits whose cursor positions are contiguous
/// (the new edit's `cursor_before` equals the session's running `cursor_after`) *and*
/// whose inter-edit gap is below `coalesce_timeout`. Either condition failing closes
/// the session — this satisfies both hints in the open question rather than picking
/// one exclusively.
pub struct UndoJournal {
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
    pending: Option<PendingSession>,
    next_seq: u64,
    coalesce_timeout: Duration,
}

impl UndoJournal {
    #[must_use]
    pub fn new(coalesce_timeout: Duration) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: None,
            next_seq: 0,
            coalesce_timeout,
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Explicitly closes any open coalescing session.
    pub fn commit_session(&mut self) {
        self.pending = None;
    }

    /// Records an edit. If it's the same kind as the currently-pending session, its
    /// cursor is contiguous with the session's last cursor, and the gap since the
    /// last edit is under the coalesce timeout, it's merged into the top-of-stack
    /// entry instead of pushed as a new one.
    pub fn push(
        &mut self,
        kind: EditKind,
        range: std::ops::Range<usize>,
        before_snapshot: String,
        after_snapshot: String,
        cursor_before: CursorPos,
        cursor_after: CursorPos,
    ) {
        self.redo_stack.clear();
        let now = Instant::now();

        let can_coalesce = match (&self.pending, self.undo_stack.last()) {
            (Some(session), Some(top)) => {
                session.kind == kind
                    && top.cursor_after == cursor_before
                    && now.duration_since(session.last_at) <= self.coalesce_timeout
            }
            _ => false,
        };

        if can_coalesce {
            let top = self.undo_stack.last_mut().expect("checked above");
            top.after_snapshot = after_snapshot;
            top.cursor_after = cursor_after;
            top.range = top.range.start.min(range.start)..top.range.end.max(range.end);
            self.pending = Some(PendingSession { kind, started_at: self.pending.as_ref().unwrap().started_at, last_at: now });
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.undo_stack.push(UndoEntry { kind, range, before_snapshot, after_snapshot, cursor_before, cursor_after, seq });
        self.pending = Some(PendingSession { kind, started_at: now, last_at: now });
    }

    /// Pushes a `Replace`-kind entry for `replace_text` and immediately closes the
    /// session: a whole-document replace never coalesces with neighboring edits.
    pub fn push_replace(
        &mut self,
        range: std::ops::Range<usize>,
        before_snapshot: String,
        after_snapshot: String,
        cursor_before: CursorPos,
        cursor_after: CursorPos,
    ) {
        self.redo_stack.clear();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.undo_stack.push(UndoEntry {
            kind: EditKind::Replace,
            range,
            before_snapshot,
            after_snapshot,
            cursor_before,
            cursor_after,
            seq,
        });
        self.pending = None;
    }

    /// Restores the before-snapshot, returning `(text, cursor, meta)`, or `None` if
    /// the stack is empty.
    pub fn undo(&mut self) -> Option<(String, CursorPos, String)> {
        let entry = self.undo_stack.pop()?;
        let meta = entry.meta();
        let result = (entry.before_snapshot.clone(), entry.cursor_before, meta);
        self.redo_stack.push(entry);
        self.pending = None;
        Some(result)
    }

    pub fn redo(&mut self) -> Option<(String, CursorPos, String)> {
        let entry = self.redo_stack.pop()?;
        let meta = entry.meta();
        let result = (entry.after_snapshot.clone(), entry.cursor_after, meta);
        self.undo_stack.push(entry);
        self.pending = None;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(offset: usize) -> CursorPos {
        CursorPos { row: crate::coords::Row(0), col: offset, offset }
    }

    #[test]
    fn undo_then_redo_restores_states() {
        let mut j = UndoJournal::new(Duration::from_millis(500));
        j.push(EditKind::Insert, 0..1, "".into(), "a".into(), cp(0), cp(1));
        let (text, cursor, _) = j.undo().unwrap();
        assert_eq!(text, "");
        assert_eq!(cursor, cp(0));
        let (text, cursor, _) = j.redo().unwrap();
        assert_eq!(text, "a");
        assert_eq!(cursor, cp(1));
    }

    #[test]
    fn undo_on_empty_stack_returns_none() {
        let mut j = UndoJournal::new(Duration::from_millis(500));
        assert!(j.undo().is_none());
    }

    #[test]
    fn coalesces_contiguous_same_kind_edits() {
        let mut j = UndoJournal::new(Duration::from_millis(500));
        j.push(EditKind::Insert, 0..1, "".into(), "a".into(), cp(0), cp(1));
        j.push(EditKind::Insert, 1..2, "a".into(), "ab".into(), cp(1), cp(2));
        assert_eq!(j.undo_stack.len(), 1);
        let (text, cursor, _) = j.undo().unwrap();
        assert_eq!(text, "");
        assert_eq!(cursor, cp(0));
    }

    #[test]
    fn cursor_jump_closes_session() {
        let mut j = UndoJournal::new(Duration::from_millis(500));
        j.push(EditKind::Insert, 0..1, "".into(), "a".into(), cp(0), cp(1));
        // Cursor jumped away from 1 before this insert -> new entry, not coalesced.
        j.push(EditKind::Insert, 5..6, "x".into(), "xy".into(), cp(5), cp(6));
        assert_eq!(j.undo_stack.len(), 2);
    }

    #[test]
    fn replace_pushes_its_own_entry_and_closes_session() {
        let mut j = UndoJournal::new(Duration::from_millis(500));
        j.push(EditKind::Insert, 0..1, "".into(), "a".into(), cp(0), cp(1));
        j.push_replace(0..1, "a".into(), "b".into(), cp(0), cp(1));
        assert_eq!(j.undo_stack.len(), 2);
        assert!(j.pending.is_none());
    }
}
