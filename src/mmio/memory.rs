//! RAM-backed register window
//!
//! Behaves like a mapped register block with plain memory behind it: what
//! is written is what is read back. `poke` stands in for the outside world
//! changing a register (an input pin being driven, for instance).

use std::ptr;

use super::{check_offset, RegisterWindow};
use crate::config::{ChipConfig, WORD_SIZE};
use crate::error::GpioResult;

#[derive(Debug, Clone)]
pub struct MemoryWindow {
    words: Vec<u32>,
    writes: usize,
}

impl MemoryWindow {
    /// Zero-filled window of `size` bytes (rounded up to whole words)
    pub fn new(size: usize) -> Self {
        Self {
            words: vec![0; size.div_ceil(WORD_SIZE)],
            writes: 0,
        }
    }

    /// Window sized for a chip configuration
    pub fn for_config(config: &ChipConfig) -> Self {
        Self::new(config.window_size)
    }

    /// Inspect a word without going through the register interface
    pub fn peek(&self, offset: usize) -> Option<u32> {
        check_offset(offset, self.size()).ok()?;
        Some(self.words[offset / WORD_SIZE])
    }

    /// Change a word from outside. Not counted as a register write.
    pub fn poke(&mut self, offset: usize, value: u32) -> GpioResult<()> {
        check_offset(offset, self.size())?;
        self.words[offset / WORD_SIZE] = value;
        Ok(())
    }

    /// Number of `write_word` calls that reached the window
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl RegisterWindow for MemoryWindow {
    fn size(&self) -> usize {
        self.words.len() * WORD_SIZE
    }

    fn read_word(&self, offset: usize) -> GpioResult<u32> {
        check_offset(offset, self.size())?;
        // SAFETY: the index is in bounds and the reference is valid
        Ok(unsafe { ptr::read_volatile(&self.words[offset / WORD_SIZE]) })
    }

    fn write_word(&mut self, offset: usize, value: u32) -> GpioResult<()> {
        check_offset(offset, self.size())?;
        // SAFETY: as in read_word
        unsafe { ptr::write_volatile(&mut self.words[offset / WORD_SIZE], value) };
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpioError;

    #[test]
    fn test_read_write() {
        let mut window = MemoryWindow::new(0x40);
        window.write_word(0x8, 0x1234_5678).unwrap();
        assert_eq!(window.read_word(0x8).unwrap(), 0x1234_5678);
        assert_eq!(window.peek(0x8), Some(0x1234_5678));
        assert_eq!(window.write_count(), 1);
    }

    #[test]
    fn test_modify_preserves_other_bits() {
        let mut window = MemoryWindow::new(0x10);
        window.poke(0x4, 0xffff_0000).unwrap();
        let value = window.modify_word(0x4, |v| v | 0x1).unwrap();
        assert_eq!(value, 0xffff_0001);
        assert_eq!(window.write_count(), 1);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut window = MemoryWindow::new(0x10);
        assert!(matches!(window.read_word(0x10), Err(GpioError::OutOfRange { .. })));
        assert!(matches!(window.write_word(0x3, 0), Err(GpioError::OutOfRange { .. })));
        assert_eq!(window.peek(0x10), None);
        assert_eq!(window.write_count(), 0);
    }

    #[test]
    fn test_size_rounds_up() {
        assert_eq!(MemoryWindow::new(0x22).size(), 0x24);
    }
}
