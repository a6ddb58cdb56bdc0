// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Tracing setup, gated behind the two `OPENTUI_DEBUG_*` environment booleans. A
//! non-blocking rolling file appender feeding a `tracing_subscriber` registry, rather
//! than hand-rolled `eprintln!` debugging.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a global tracing subscriber that writes to `log_dir/opentui-core.log`.
///
/// Returns the [`WorkerGuard`] for the non-blocking writer; the caller must keep it
/// alive for the process's lifetime (dropping it flushes and stops the writer thread).
/// Call this at most once per process — a second call is a logic error the same way
/// re-initializing the capability cache would be, so it's deliberately infallible and
/// idempotent: later calls are ignored.
pub fn init_tracing(log_dir: impl AsRef<Path>, debug_trace: bool) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::daily(log_dir.as_ref(), "opentui-core.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let filter = if debug_trace {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(false);

    // Ignore the error: a second call from, e.g., a test harness that already
    // installed a subscriber is not fatal, it just means our layer is dropped.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    Some(guard)
}

/// Records wall-clock duration of `f` as a `trace`-level event when `enabled`, for the
/// per-call timing histogram feature. Rather than a bespoke profiler, call sites lean
/// on `tracing`'s own timing facilities.
pub fn timed<R>(enabled: bool, op_name: &'static str, f: impl FnOnce() -> R) -> R {
    if !enabled {
        return f();
    }
    let start = std::time::Instant::now();
    let result = f();
    tracing::trace!(target: "opentui_core::timing", op = op_name, elapsed_us = start.elapsed().as_micros() as u64);
    result
}
