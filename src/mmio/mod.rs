//! Register windows
//!
//! A register window is a fixed-size block of 32-bit hardware registers.
//! Access goes through [`RegisterWindow`] only: every read and write is word
//! aligned, bounds checked, and issued as exactly one volatile access so
//! the compiler never elides, merges or reorders register traffic.
//!
//! - [`RegisterMap`]: the PIO controller mapped from `/dev/mem` (unix only)
//! - [`MemoryWindow`]: a RAM-backed window for hosts without the hardware

#[cfg(unix)]
pub mod devmem;
pub mod memory;

#[cfg(unix)]
pub use devmem::RegisterMap;
pub use memory::MemoryWindow;

use crate::config::WORD_SIZE;
use crate::error::{GpioError, GpioResult};

/// Word-granular access to a block of hardware registers
pub trait RegisterWindow {
    /// Window length in bytes
    fn size(&self) -> usize;

    /// Read the word at byte `offset`
    fn read_word(&self, offset: usize) -> GpioResult<u32>;

    /// Write the word at byte `offset`
    fn write_word(&mut self, offset: usize, value: u32) -> GpioResult<()>;

    /// Read a word, transform it, and write the result back.
    ///
    /// Not atomic: callers sharing a window across threads must serialize
    /// read-modify-write sequences on the same word themselves.
    fn modify_word<F>(&mut self, offset: usize, f: F) -> GpioResult<u32>
    where
        Self: Sized,
        F: FnOnce(u32) -> u32,
    {
        let value = f(self.read_word(offset)?);
        self.write_word(offset, value)?;
        Ok(value)
    }

    /// Give up the underlying resource. Must be safe to call repeatedly.
    fn release(&mut self) -> GpioResult<()> {
        Ok(())
    }
}

/// Reject offsets that are unaligned or not fully inside the window
pub(crate) fn check_offset(offset: usize, window_size: usize) -> GpioResult<()> {
    let in_range = offset
        .checked_add(WORD_SIZE)
        .is_some_and(|end| end <= window_size);
    if offset % WORD_SIZE != 0 || !in_range {
        return Err(GpioError::OutOfRange { offset, window_size });
    }
    Ok(())
}
