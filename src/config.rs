// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Process-wide configuration read from the environment, gating tracing the way a
//! handful of `DEBUG_*` booleans would. There is no config *file* format: just two
//! environment booleans plus an output-mode selector.

use std::time::Duration;

use crate::width::WidthPolicy;

/// `OPENTUI_DEBUG_TRACE=1` — trace every core call at `debug` level.
pub const ENV_DEBUG_TRACE: &str = "OPENTUI_DEBUG_TRACE";

/// `OPENTUI_DEBUG_TIMING=1` — record per-call timing histograms, dumped at process exit.
pub const ENV_DEBUG_TIMING: &str = "OPENTUI_DEBUG_TIMING";

/// `OPENTUI_OUTPUT_MODE=native|buffered` — see [`OutputMode`].
pub const ENV_OUTPUT_MODE: &str = "OPENTUI_OUTPUT_MODE";

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
}

/// Distinguishes "native write-to-TTY" from "buffered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// `render()` blocks on TTY writes directly.
    #[default]
    Native,
    /// `render()` fills a byte buffer and returns it for the embedder to drain
    /// asynchronously; a pending-drain flag refuses further renders until drained.
    Buffered,
}

impl OutputMode {
    fn from_env() -> Self {
        match std::env::var(ENV_OUTPUT_MODE).as_deref() {
            Ok("buffered") => OutputMode::Buffered,
            _ => OutputMode::Native,
        }
    }
}

/// Renderer-wide configuration, read once at renderer construction.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    pub output_mode: OutputMode,
    pub debug_trace: bool,
    pub debug_timing: bool,
    /// Capability probe timeout, default 100 ms.
    pub capability_timeout: Duration,
    /// `scroll_margin` fraction, clamped to `[0, 0.45]` at use site.
    pub default_scroll_margin: f32,
    /// Undo coalesce window. We pick a flat 500 ms window and coalesce on
    /// cursor-contiguity rather than re-measuring cursor jumps against a distance
    /// threshold (see DESIGN.md).
    pub undo_coalesce_timeout: Duration,
    pub width_policy: WidthPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::from_env(),
            debug_trace: env_flag(ENV_DEBUG_TRACE),
            debug_timing: env_flag(ENV_DEBUG_TIMING),
            capability_timeout: Duration::from_millis(100),
            default_scroll_margin: 0.25,
            undo_coalesce_timeout: Duration::from_millis(500),
            width_policy: WidthPolicy::Unicode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = RendererConfig::default();
        assert_eq!(cfg.capability_timeout, Duration::from_millis(100));
        assert!(cfg.default_scroll_margin > 0.0 && cfg.default_scroll_margin <= 0.45);
    }

    #[test]
    fn env_flag_accepts_common_truthy_values() {
        assert!(env_flag("OPENTUI_CORE_NONEXISTENT_XYZ") == false);
    }
}
