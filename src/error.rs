// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Error types for the native core. Nothing in this crate unwinds across the
//! library boundary; every fallible operation returns a [`CoreError`] (or, for
//! undo/redo, `None`) instead.

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by [`crate::buffer::OptimizedBuffer`], [`crate::text_buffer::TextBuffer`],
/// [`crate::edit_buffer::EditBuffer`], and the view/renderer layers.
///
/// `destroyed` and `invalid_memory` are fatal in the caller's context (the handle is
/// unusable); `out_of_bounds` is clamped where semantics allow; `io` and
/// `capability_timeout` are recoverable and the embedder decides how to proceed.
#[derive(Debug, Error, Diagnostic)]
pub enum CoreError {
    /// Any operation invoked on a handle after `destroy()`.
    #[error("handle used after destroy()")]
    #[diagnostic(code(opentui_core::destroyed))]
    Destroyed,

    /// Scissor-stack underflow, or a row/col that cannot be clamped into range.
    #[error("out of bounds: {0}")]
    #[diagnostic(code(opentui_core::out_of_bounds))]
    OutOfBounds(String),

    /// A `MemId` that was never registered, or was released by `clear_mem_registry`.
    #[error("unknown memory region id: {0:?}")]
    #[diagnostic(code(opentui_core::invalid_memory))]
    InvalidMemory(crate::mem_registry::MemId),

    /// Terminal write failure, or a file read failure from `load_file`.
    #[error("io error: {0}")]
    #[diagnostic(code(opentui_core::io))]
    Io(#[from] std::io::Error),

    /// The capability probe did not get a response within the configured timeout.
    #[error("capability probe timed out after {0:?}")]
    #[diagnostic(code(opentui_core::capability_timeout))]
    CapabilityTimeout(std::time::Duration),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Panics in debug builds, is a no-op in release builds. Used for programmer errors
/// that should never happen in a correct embedder (scissor underflow, pushing to a
/// destroyed handle's internal state, width-policy changed after creation).
#[track_caller]
pub(crate) fn fatal_in_debug(msg: &str) {
    if cfg!(debug_assertions) {
        panic!("{msg}");
    } else {
        tracing::warn!(target: "opentui_core::fatal_in_debug", "{msg}");
    }
}
