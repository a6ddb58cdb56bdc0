// Licensed under the Apache License, Version 2.0. See LICENSE.

//! SIGWINCH-driven terminal resize: a `mio::Poll` multiplexes the signal pipe
//! alongside other readiness sources so the render thread's event loop never needs a
//! dedicated polling thread just for resize.

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use mio::{Events, Interest, Poll, Token};
    use signal_hook::consts::SIGWINCH;
    use signal_hook_mio::v1_0::Signals;

    const SIGNAL_TOKEN: Token = Token(0);

    /// Registers a SIGWINCH listener on a fresh `mio::Poll` instance. The render
    /// thread's frame loop calls `poll` with a short timeout once per iteration;
    /// a `Some(())` return means the terminal was resized since the last call and
    /// the caller should re-query the TTY dimensions (`ioctl TIOCGWINSZ`, outside
    /// this crate's scope — the embedder supplies the new size).
    pub struct ResizeWatcher {
        poll: Poll,
        signals: Signals,
        events: Events,
    }

    impl ResizeWatcher {
        /// # Errors
        ///
        /// Returns an I/O error if the signal pipe or poll instance cannot be set up.
        pub fn new() -> io::Result<Self> {
            let poll = Poll::new()?;
            let mut signals = Signals::new([SIGWINCH])?;
            poll.registry().register(&mut signals, SIGNAL_TOKEN, Interest::READABLE)?;
            Ok(Self { poll, signals, events: Events::with_capacity(4) })
        }

        /// Polls for a pending SIGWINCH within `timeout`. Returns `true` if at least
        /// one resize signal was observed.
        pub fn poll_resized(&mut self, timeout: std::time::Duration) -> io::Result<bool> {
            self.events.clear();
            self.poll.poll(&mut self.events, Some(timeout))?;
            let mut resized = false;
            for event in &self.events {
                if event.token() == SIGNAL_TOKEN {
                    for signal in self.signals.pending() {
                        if signal == SIGWINCH {
                            resized = true;
                        }
                    }
                }
            }
            Ok(resized)
        }
    }
}

#[cfg(unix)]
pub use unix_impl::ResizeWatcher;

/// Non-Unix fallback: resize is never signaled; the embedder must call
/// `Renderer::resize` explicitly (e.g. from a platform resize event).
#[cfg(not(unix))]
pub struct ResizeWatcher;

#[cfg(not(unix))]
impl ResizeWatcher {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub fn poll_resized(&mut self, _timeout: std::time::Duration) -> std::io::Result<bool> {
        Ok(false)
    }
}
