// Licensed under the Apache License, Version 2.0. See LICENSE.

//! The mem-registry: an append-only table of immutable
//! byte regions that [`crate::rope::Rope`] leaves borrow from. A rope leaf never owns
//! bytes directly — it holds a `(MemId, offset, len)` piece, so splicing text never
//! copies the original bytes, only records new pieces.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{CoreError, CoreResult};

/// Identifies a registered memory region: a small copy-friendly integer rather than a
/// random id, since ropes dereference this on every leaf walk and it needs to stay
/// cheap to copy and compare (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemId(pub u64);

struct Region {
    bytes: Arc<[u8]>,
    /// `true` for an "add"-buffer style region the core itself allocated (e.g. from
    /// `append`); `false` for an "original" region such as a loaded file's raw bytes.
    /// Only informational today — both kinds live exactly as long as the registry
    /// entry.
    #[allow(dead_code)]
    owned: bool,
}

/// Append-only memory region registry.
#[derive(Default)]
pub struct MemRegistry {
    regions: FxHashMap<MemId, Region>,
    next_id: u64,
}

impl MemRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytes` as a new region and returns its id. `owned` distinguishes an
    /// "add" buffer (core-allocated, e.g. from `append`) from an "original" buffer
    /// (e.g. a loaded file or an externally supplied byte slice).
    pub fn register(&mut self, bytes: impl Into<Arc<[u8]>>, owned: bool) -> MemId {
        let id = MemId(self.next_id);
        self.next_id += 1;
        self.regions.insert(id, Region { bytes: bytes.into(), owned });
        id
    }

    pub fn get(&self, id: MemId) -> CoreResult<&Arc<[u8]>> {
        self.regions.get(&id).map(|r| &r.bytes).ok_or(CoreError::InvalidMemory(id))
    }

    /// Releases every registered region. Ropes holding leaves into a cleared region
    /// must not be walked afterward; callers clear the registry only when they also
    /// discard the ropes built on top of it (`TextBuffer::reset`).
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_fetch_roundtrip() {
        let mut reg = MemRegistry::new();
        let id = reg.register(b"hello".to_vec(), true);
        assert_eq!(&**reg.get(id).unwrap(), b"hello");
    }

    #[test]
    fn unknown_id_is_invalid_memory() {
        let reg = MemRegistry::new();
        let err = reg.get(MemId(999)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidMemory(MemId(999))));
    }

    #[test]
    fn clear_drops_all_regions() {
        let mut reg = MemRegistry::new();
        reg.register(b"a".to_vec(), true);
        reg.register(b"b".to_vec(), false);
        assert_eq!(reg.len(), 2);
        reg.clear();
        assert!(reg.is_empty());
    }
}
