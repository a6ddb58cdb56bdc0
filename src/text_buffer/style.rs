// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Styled-chunk metadata and the syntax-style palette.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::cell::{Attrs, Rgba};

/// Per-range style override; omitted fields fall back to the `TextBuffer`'s
/// defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleOverride {
    pub fg: Option<Rgba>,
    pub bg: Option<Rgba>,
    pub attrs: Option<Attrs>,
}

/// A styled range over char offsets.
#[derive(Debug, Clone, Copy)]
pub struct StyledChunk {
    pub start: usize,
    pub end: usize,
    pub style: StyleOverride,
}

/// An input chunk to `set_styled_text`: literal text plus its style.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub text: String,
    pub style: StyleOverride,
}

/// Resolves a [`StyleId`] to the actual colors/attributes.
pub type StyleId = u32;

#[derive(Default)]
struct PaletteInner {
    name_to_id: FxHashMap<String, StyleId>,
    resolved: Vec<StyleOverride>,
}

/// Append-only `name -> style_id` map. Shared by
/// reference across `TextBuffer`s — cloning a [`SyntaxPalette`] clones the `Arc`, not
/// the table, so all clones observe later mutations.
#[derive(Clone, Default)]
pub struct SyntaxPalette {
    inner: Arc<Mutex<PaletteInner>>,
}

impl SyntaxPalette {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name -> style` if not already present, returning its id. Calling
    /// this again for an existing name returns the *original* id and leaves the
    /// resolved style unchanged — the palette is append-only, not an upsert map.
    pub fn define(&self, name: &str, style: StyleOverride) -> StyleId {
        let mut inner = self.inner.lock().expect("palette mutex poisoned");
        if let Some(&id) = inner.name_to_id.get(name) {
            return id;
        }
        let id = inner.resolved.len() as StyleId;
        inner.resolved.push(style);
        inner.name_to_id.insert(name.to_string(), id);
        id
    }

    #[must_use]
    pub fn resolve(&self, id: StyleId) -> Option<StyleOverride> {
        let inner = self.inner.lock().expect("palette mutex poisoned");
        inner.resolved.get(id as usize).copied()
    }

    #[must_use]
    pub fn id_for_name(&self, name: &str) -> Option<StyleId> {
        let inner = self.inner.lock().expect("palette mutex poisoned");
        inner.name_to_id.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_is_idempotent_for_same_name() {
        let palette = SyntaxPalette::new();
        let a = palette.define("keyword", StyleOverride { fg: Some(Rgba::WHITE), ..Default::default() });
        let b = palette.define("keyword", StyleOverride { fg: Some(Rgba::BLACK), ..Default::default() });
        assert_eq!(a, b);
        // First definition wins; palette is append-only, not an upsert map.
        assert_eq!(palette.resolve(a).unwrap().fg, Some(Rgba::WHITE));
    }

    #[test]
    fn shared_by_reference() {
        let palette = SyntaxPalette::new();
        let clone = palette.clone();
        let id = palette.define("string", StyleOverride::default());
        assert_eq!(clone.id_for_name("string"), Some(id));
    }
}
