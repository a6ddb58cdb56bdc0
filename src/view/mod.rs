// Licensed under the Apache License, Version 2.0. See LICENSE.

//! View layer: wrapping, viewport slicing, and cursor/selection
//! coordinate conversions over a [`crate::text_buffer::TextBuffer`].

pub mod editor_view;
pub mod text_buffer_view;
pub mod wrap;

pub use editor_view::{EditorView, VisualCursor};
pub use text_buffer_view::{LineInfo, TextBufferView};
pub use wrap::{VisualSegment, WrapMode};
