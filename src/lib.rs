// Licensed under the Apache License, Version 2.0. See LICENSE.

//! `opentui_core` — the native text/render core for terminal UIs: a
//! double-buffered cell grid with damage-tracked flushing, a rope-backed text
//! buffer with undo history, and a view layer that maps logical characters to
//! viewport-relative visual coordinates honoring wide graphemes and soft wrapping.
//!
//! Module dependency order (leaves first), matching the layering this crate is
//! built in: [`width`] → [`cell`] / [`buffer`] → [`rope`] → [`text_buffer`] →
//! [`edit_buffer`] → [`view`] → [`renderer`].
//!
//! This crate has no CLI surface and does not declare a component/layout tree,
//! animation, or framework bindings — it is the rendering and text-editing engine
//! those would sit on top of.

pub mod buffer;
pub mod cell;
pub mod config;
pub mod coords;
pub mod edit_buffer;
pub mod error;
pub mod logging;
pub mod mem_registry;
pub mod renderer;
pub mod rope;
pub mod text_buffer;
pub mod view;
pub mod width;

pub use buffer::OptimizedBuffer;
pub use config::RendererConfig;
pub use edit_buffer::EditBuffer;
pub use error::{CoreError, CoreResult};
pub use renderer::Renderer;
pub use rope::Rope;
pub use text_buffer::TextBuffer;
pub use view::{EditorView, TextBufferView};
pub use width::WidthPolicy;
