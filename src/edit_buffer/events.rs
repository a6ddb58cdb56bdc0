// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Event emission. There is no microtask queue in a native library, so "deferred via a
//! microtask/queued step" becomes an explicit coalescing queue the embedder drains
//! once per settle point.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditEvent {
    CursorChanged,
    ContentChanged,
}

/// Coalesces a burst of synchronous operations into at most one event of each kind
/// per settle point, while preserving the relative order of `CursorChanged` vs
/// `ContentChanged` within one logical change group.
///
/// Coalescing is per-kind across the *whole* pending batch, not just adjacent
/// duplicates: a `ContentChanged` emitted by one edit and another `ContentChanged`
/// emitted by a later edit in the same settle point still collapse to one entry,
/// even with a `CursorChanged` emitted in between.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<EditEvent>,
    seen_cursor_changed: bool,
    seen_content_changed: bool,
    destroyed: bool,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks this queue's owner destroyed; further `emit` calls are no-ops.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.pending.clear();
        self.seen_cursor_changed = false;
        self.seen_content_changed = false;
    }

    pub fn emit(&mut self, event: EditEvent) {
        if self.destroyed {
            return;
        }
        let seen = match event {
            EditEvent::CursorChanged => &mut self.seen_cursor_changed,
            EditEvent::ContentChanged => &mut self.seen_content_changed,
        };
        if *seen {
            return; // already queued for this settle point
        }
        *seen = true;
        self.pending.push(event);
    }

    /// Drains and returns the coalesced events in first-emission order.
    pub fn drain(&mut self) -> Vec<EditEvent> {
        self.seen_cursor_changed = false;
        self.seen_content_changed = false;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_same_kind_coalesces() {
        let mut q = EventQueue::new();
        q.emit(EditEvent::ContentChanged);
        q.emit(EditEvent::ContentChanged);
        assert_eq!(q.drain(), vec![EditEvent::ContentChanged]);
    }

    #[test]
    fn preserves_first_emission_order_across_kinds() {
        let mut q = EventQueue::new();
        q.emit(EditEvent::CursorChanged);
        q.emit(EditEvent::ContentChanged);
        // A third emit of a kind already queued this settle point coalesces away
        // rather than appending a second entry.
        q.emit(EditEvent::CursorChanged);
        assert_eq!(q.drain(), vec![EditEvent::CursorChanged, EditEvent::ContentChanged]);
    }

    #[test]
    fn non_adjacent_same_kind_emits_still_coalesce() {
        let mut q = EventQueue::new();
        q.emit(EditEvent::ContentChanged);
        q.emit(EditEvent::CursorChanged);
        q.emit(EditEvent::ContentChanged);
        assert_eq!(q.drain(), vec![EditEvent::ContentChanged, EditEvent::CursorChanged]);
    }

    #[test]
    fn destroyed_queue_emits_nothing() {
        let mut q = EventQueue::new();
        q.destroy();
        q.emit(EditEvent::ContentChanged);
        assert!(q.drain().is_empty());
    }
}
