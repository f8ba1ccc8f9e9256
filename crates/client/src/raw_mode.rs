//! Raw mode terminal wrapper for crossterm
//!
//! Ensures the terminal is restored to normal mode on drop (even on panic).

use anyhow::Result;
use crossterm::terminal;

/// Guard that enables raw mode and restores normal mode on drop.
pub struct RawModeGuard;

impl RawModeGuard {
    /// Enable raw mode for the terminal.
    ///
    /// Raw mode turns off line buffering and local echo, so the editor sees
    /// each keystroke immediately and controls what appears on screen.
    pub fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore - ignore errors during cleanup
        let _ = terminal::disable_raw_mode();
    }
}
