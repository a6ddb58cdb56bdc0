// Licensed under the Apache License, Version 2.0. See LICENSE.

//! Raw mode and the fixed CSI/OSC vocabulary the renderer writes. Raw-mode
//! enable/disable uses `rustix` termios calls directly: save the original settings
//! once, restore them on disable, and surface failures as `CoreError` so they compose
//! with the rest of this crate's error type.

use std::io::{self, Write};
use std::sync::{LazyLock, Mutex};

use rustix::termios::{self, ControlModes, InputModes, LocalModes, OptionalActions, OutputModes, SpecialCodeIndex, Termios};

use crate::error::{CoreError, CoreResult};

static ORIGINAL_TERMIOS: LazyLock<Mutex<Option<Termios>>> = LazyLock::new(|| Mutex::new(None));

/// Enables raw mode on stdin: no echo, no line buffering, no signal-generating
/// keys, `VMIN=1`/`VTIME=0` for byte-at-a-time reads. Saves the prior settings the
/// first time it's called so `disable_raw_mode` can restore them.
///
/// # Errors
///
/// Returns `CoreError::Io` if the terminal attributes cannot be read or set.
pub fn enable_raw_mode() -> CoreResult<()> {
    let stdin = io::stdin();
    let mut attrs = termios::tcgetattr(&stdin).map_err(io::Error::from)?;

    {
        let mut original = ORIGINAL_TERMIOS.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if original.is_none() {
            *original = Some(attrs.clone());
        }
    }

    attrs.input_modes.remove(
        InputModes::IGNBRK | InputModes::BRKINT | InputModes::PARMRK | InputModes::ISTRIP | InputModes::INLCR | InputModes::IGNCR | InputModes::ICRNL | InputModes::IXON,
    );
    attrs.output_modes.remove(OutputModes::OPOST);
    attrs.local_modes.remove(LocalModes::ECHO | LocalModes::ECHONL | LocalModes::ICANON | LocalModes::ISIG | LocalModes::IEXTEN);
    attrs.control_modes.remove(ControlModes::CSIZE | ControlModes::PARENB);
    attrs.control_modes.insert(ControlModes::CS8);
    attrs.special_codes[SpecialCodeIndex::VMIN] = 1;
    attrs.special_codes[SpecialCodeIndex::VTIME] = 0;

    termios::tcsetattr(&stdin, OptionalActions::Now, &attrs).map_err(io::Error::from)?;
    Ok(())
}

/// Restores the settings saved by the first `enable_raw_mode` call. No-op if raw
/// mode was never enabled.
///
/// # Errors
///
/// Returns `CoreError::Io` if the terminal attributes cannot be restored.
pub fn disable_raw_mode() -> CoreResult<()> {
    let original = ORIGINAL_TERMIOS.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(ref attrs) = *original {
        let stdin = io::stdin();
        termios::tcsetattr(&stdin, OptionalActions::Now, attrs).map_err(io::Error::from)?;
    }
    Ok(())
}

/// Fixed CSI/OSC vocabulary. Grouped as `const`s rather than
/// a builder API: the renderer only ever needs these exact sequences, not a general
/// escape-sequence DSL.
pub mod seq {
    pub const ENTER_ALT_SCREEN: &str = "\x1b[?1049h";
    pub const LEAVE_ALT_SCREEN: &str = "\x1b[?1049l";
    pub const CLEAR_SCREEN: &str = "\x1b[2J";
    pub const CURSOR_HOME: &str = "\x1b[H";
    pub const CURSOR_SHOW: &str = "\x1b[?25h";
    pub const CURSOR_HIDE: &str = "\x1b[?25l";
    pub const MOUSE_ON: &str = "\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1006h\x1b[?1015h";
    pub const MOUSE_OFF: &str = "\x1b[?1015l\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l";
    pub const SYNC_BEGIN: &str = "\x1b[?2026h";
    pub const SYNC_END: &str = "\x1b[?2026l";
    pub const KITTY_KEYBOARD_ON: &str = "\x1b[>1u";
    pub const KITTY_KEYBOARD_OFF: &str = "\x1b[<u";

    /// `\x1b[<r>;<c>H` — 1-based row/col cursor positioning.
    #[must_use]
    pub fn cursor_position(row: u32, col: u32) -> String {
        format!("\x1b[{};{}H", row + 1, col + 1)
    }

    /// `\x1b[<n> q` — cursor style (1=block-blink .. 6=bar-steady).
    #[must_use]
    pub fn cursor_style(n: u8) -> String {
        format!("\x1b[{n} q")
    }

    /// `\x1b]12;<color>\x07` — OSC cursor color.
    #[must_use]
    pub fn cursor_color(color: &str) -> String {
        format!("\x1b]12;{color}\x07")
    }
}

/// Destination for encoded frame bytes.
pub trait FrameSink {
    /// # Errors
    ///
    /// Returns `CoreError::Io` on write failure.
    fn write_frame(&mut self, bytes: &[u8]) -> CoreResult<()>;
}

/// Writes directly to stdout, blocking the render thread on the TTY write.
#[derive(Debug, Default)]
pub struct NativeSink;

impl FrameSink for NativeSink {
    fn write_frame(&mut self, bytes: &[u8]) -> CoreResult<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes).map_err(CoreError::Io)?;
        stdout.flush().map_err(CoreError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_position_is_one_based() {
        assert_eq!(seq::cursor_position(0, 0), "\x1b[1;1H");
        assert_eq!(seq::cursor_position(4, 9), "\x1b[5;10H");
    }
}
