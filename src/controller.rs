//! Pin controller
//!
//! Translates pin-level requests into read-modify-write cycles on the bank
//! registers of a [`RegisterWindow`].
//!
//! # Register Layout (per bank, default sunxi layout)
//!
//! | Offset | Register  | Pins per word | Bits per pin |
//! |--------|-----------|---------------|--------------|
//! | 0x00   | CFG0..3   | 8             | 4            |
//! | 0x10   | DAT       | 32            | 1            |
//! | 0x14   | DRV0..1   | 16            | 2            |
//! | 0x1C   | PULL0..1  | 16            | 2            |
//!
//! Every operation validates its arguments before the first register access,
//! so a rejected call never leaves a register half-updated. Operations are
//! not atomic with respect to other threads: pins in the same bank share
//! register words and concurrent callers must serialize access.

use crate::config::{ChipConfig, RegisterLayout, WORD_SIZE};
use crate::error::{GpioError, GpioResult};
use crate::mmio::RegisterWindow;
use crate::pin::{PinDrive, PinId, PinLevel, PinMode, PinPull};

const FUNCTION_BITS: u32 = 4;
const DATA_BITS: u32 = 1;
const DRIVE_BITS: u32 = 2;
const PULL_BITS: u32 = 2;

/// A bit-field of one pin inside one register word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    offset: usize,
    shift: u32,
    width: u32,
}

impl Field {
    /// Field for `bit` in a register group starting at `group_offset`, where
    /// each pin takes `width` bits
    fn locate(group_offset: usize, bit: u8, width: u32) -> Self {
        let pins_per_word = u32::BITS / width;
        let bit = u32::from(bit);
        Self {
            offset: group_offset + (bit / pins_per_word) as usize * WORD_SIZE,
            shift: (bit % pins_per_word) * width,
            width,
        }
    }

    fn value_mask(&self) -> u32 {
        (1u32 << self.width) - 1
    }

    fn extract(&self, word: u32) -> u32 {
        (word >> self.shift) & self.value_mask()
    }

    fn insert(&self, word: u32, value: u32) -> u32 {
        let mask = self.value_mask();
        (word & !(mask << self.shift)) | ((value & mask) << self.shift)
    }
}

/// High-level pin operations on top of a register window
#[derive(Debug)]
pub struct PinController<W> {
    window: W,
    bank_count: u8,
    register_stride: usize,
    layout: RegisterLayout,
}

impl<W: RegisterWindow> PinController<W> {
    /// Create a controller for `config` over an already opened window
    pub fn new(window: W, config: &ChipConfig) -> GpioResult<Self> {
        config.validate()?;
        let required = config.required_window()?;
        if window.size() < required {
            return Err(GpioError::InvalidConfig(format!(
                "register window of {:#x} bytes cannot hold {} banks ({:#x} bytes)",
                window.size(),
                config.bank_count,
                required
            )));
        }

        Ok(Self {
            window,
            bank_count: config.bank_count,
            register_stride: config.register_stride,
            layout: config.layout,
        })
    }

    pub fn bank_count(&self) -> u8 {
        self.bank_count
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn into_window(self) -> W {
        self.window
    }

    fn check_pin(&self, pin: PinId) -> GpioResult<()> {
        if pin.bank() >= self.bank_count {
            return Err(GpioError::InvalidPin {
                bank: pin.bank(),
                bit: pin.bit(),
            });
        }
        Ok(())
    }

    fn bank_base(&self, bank: u8) -> usize {
        usize::from(bank) * self.register_stride
    }

    fn function_field(&self, pin: PinId) -> Field {
        Field::locate(self.bank_base(pin.bank()) + self.layout.config_offset, pin.bit(), FUNCTION_BITS)
    }

    fn data_field(&self, pin: PinId) -> Field {
        Field::locate(self.bank_base(pin.bank()) + self.layout.data_offset, pin.bit(), DATA_BITS)
    }

    fn drive_field(&self, pin: PinId) -> Field {
        Field::locate(self.bank_base(pin.bank()) + self.layout.drive_offset, pin.bit(), DRIVE_BITS)
    }

    fn pull_field(&self, pin: PinId) -> Field {
        Field::locate(self.bank_base(pin.bank()) + self.layout.pull_offset, pin.bit(), PULL_BITS)
    }

    fn read_field(&self, field: Field) -> GpioResult<u32> {
        Ok(field.extract(self.window.read_word(field.offset)?))
    }

    fn write_field(&mut self, field: Field, value: u32) -> GpioResult<()> {
        self.window
            .modify_word(field.offset, |word| field.insert(word, value))
            .map(|_| ())
    }

    /// Select the pin's function
    pub fn set_mode(&mut self, pin: PinId, mode: PinMode) -> GpioResult<()> {
        self.check_pin(pin)?;
        let raw = mode.encode()?;
        self.write_field(self.function_field(pin), raw)?;
        log::debug!("{}: mode {}", pin, mode);
        Ok(())
    }

    /// Current function of the pin
    pub fn get_mode(&self, pin: PinId) -> GpioResult<PinMode> {
        self.check_pin(pin)?;
        Ok(PinMode::decode(self.read_field(self.function_field(pin))?))
    }

    /// Drive an output pin. Pins not configured as outputs are rejected
    /// with `WrongMode` and the data register is left alone.
    pub fn set_level(&mut self, pin: PinId, level: PinLevel) -> GpioResult<()> {
        self.check_pin(pin)?;
        let mode = self.get_mode(pin)?;
        if mode != PinMode::Output {
            log::warn!("{}: refusing to drive {} while configured as {}", pin, level, mode);
            return Err(GpioError::WrongMode { pin, mode });
        }
        self.write_field(self.data_field(pin), u32::from(level.is_high()))?;
        log::debug!("{}: level {}", pin, level);
        Ok(())
    }

    /// Sample the pin's data bit. Works in any mode.
    pub fn get_level(&self, pin: PinId) -> GpioResult<PinLevel> {
        self.check_pin(pin)?;
        Ok(PinLevel::from(self.read_field(self.data_field(pin))? != 0))
    }

    pub fn set_pull(&mut self, pin: PinId, pull: PinPull) -> GpioResult<()> {
        self.check_pin(pin)?;
        self.write_field(self.pull_field(pin), pull.encode())?;
        log::debug!("{}: pull {}", pin, pull);
        Ok(())
    }

    pub fn get_pull(&self, pin: PinId) -> GpioResult<PinPull> {
        self.check_pin(pin)?;
        Ok(PinPull::decode(self.read_field(self.pull_field(pin))?))
    }

    pub fn set_drive(&mut self, pin: PinId, drive: PinDrive) -> GpioResult<()> {
        self.check_pin(pin)?;
        self.write_field(self.drive_field(pin), drive.encode())?;
        log::debug!("{}: drive {}", pin, drive);
        Ok(())
    }

    pub fn get_drive(&self, pin: PinId) -> GpioResult<PinDrive> {
        self.check_pin(pin)?;
        Ok(PinDrive::decode(self.read_field(self.drive_field(pin))?))
    }

    /// Every word of one bank's register group as `(bank-relative offset, value)`
    pub fn bank_words(&self, bank: u8) -> GpioResult<Vec<(usize, u32)>> {
        if bank >= self.bank_count {
            return Err(GpioError::InvalidPin { bank, bit: 0 });
        }

        let base = self.bank_base(bank);
        (0..self.register_stride)
            .step_by(WORD_SIZE)
            .map(|offset| self.window.read_word(base + offset).map(|word| (offset, word)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::MemoryWindow;

    const BANK_STRIDE: usize = 0x24;

    fn chip() -> ChipConfig {
        ChipConfig::new("test", 0x01C2_0800, 0x400, 9, BANK_STRIDE)
    }

    fn controller() -> PinController<MemoryWindow> {
        let config = chip();
        PinController::new(MemoryWindow::for_config(&config), &config).unwrap()
    }

    fn pin(name: &str) -> PinId {
        name.parse().unwrap()
    }

    #[test]
    fn test_field_locate() {
        let f = Field::locate(0x24, 12, FUNCTION_BITS);
        assert_eq!((f.offset, f.shift), (0x28, 16));

        let f = Field::locate(0x1C, 17, PULL_BITS);
        assert_eq!((f.offset, f.shift), (0x20, 2));

        let f = Field::locate(0x10, 31, DATA_BITS);
        assert_eq!((f.offset, f.shift), (0x10, 31));
    }

    #[test]
    fn test_field_insert_masks_value() {
        let f = Field::locate(0, 1, PULL_BITS);
        // an oversized value must not spill into neighbouring fields
        assert_eq!(f.insert(0, 0xff), 0b1100);
        assert_eq!(f.insert(0xffff_ffff, 0), 0xffff_fff3);
    }

    #[test]
    fn test_set_mode_changes_only_target_nibble() {
        let mut gpio = controller();
        let background = 0x5a5a_5a5a;
        let modes = [
            PinMode::Input,
            PinMode::Output,
            PinMode::AlternateFunction(2),
            PinMode::AlternateFunction(6),
            PinMode::Disabled,
        ];

        for bank in 0..9u8 {
            for bit in 0..32u8 {
                let p = PinId::new(bank, bit).unwrap();
                let field = gpio.function_field(p);
                for mode in modes {
                    gpio.window_mut().poke(field.offset, background).unwrap();
                    gpio.set_mode(p, mode).unwrap();

                    let after = gpio.window().peek(field.offset).unwrap();
                    let nibble = 0xf << field.shift;
                    assert_eq!(after & !nibble, background & !nibble, "{} {:?}", p, mode);
                    assert_eq!(gpio.get_mode(p).unwrap(), mode);
                }
            }
        }
    }

    #[test]
    fn test_level_round_trip() {
        let mut gpio = controller();
        for name in ["PA0", "PB7", "PH12", "PI31"] {
            let p = pin(name);
            gpio.set_mode(p, PinMode::Output).unwrap();
            gpio.set_level(p, PinLevel::High).unwrap();
            assert_eq!(gpio.get_level(p).unwrap(), PinLevel::High);
            gpio.set_level(p, PinLevel::Low).unwrap();
            assert_eq!(gpio.get_level(p).unwrap(), PinLevel::Low);
        }
    }

    #[test]
    fn test_set_level_requires_output() {
        let mut gpio = controller();
        let p = pin("PC3");
        let data = gpio.data_field(p).offset;
        gpio.window_mut().poke(data, 0x0000_00f0).unwrap();

        for mode in [PinMode::Input, PinMode::AlternateFunction(3), PinMode::Disabled] {
            gpio.set_mode(p, mode).unwrap();
            let writes = gpio.window().write_count();

            let err = gpio.set_level(p, PinLevel::High).unwrap_err();
            assert!(matches!(err, GpioError::WrongMode { mode: m, .. } if m == mode));
            assert_eq!(gpio.window().write_count(), writes);
            assert_eq!(gpio.window().peek(data), Some(0x0000_00f0));
        }
    }

    #[test]
    fn test_output_scenario_pa4() {
        let mut gpio = controller();
        let a4 = pin("PA4");
        gpio.window_mut().poke(0x00, 0x7777_7777).unwrap();

        gpio.set_mode(a4, PinMode::Output).unwrap();
        assert_eq!(gpio.window().peek(0x00), Some(0x7771_7777));

        gpio.set_level(a4, PinLevel::High).unwrap();
        assert_eq!(gpio.window().peek(0x10), Some(1 << 4));
        assert_eq!(gpio.get_level(a4).unwrap(), PinLevel::High);

        gpio.set_mode(a4, PinMode::Input).unwrap();
        // the external circuit now owns the level
        gpio.window_mut().poke(0x10, 0).unwrap();
        assert_eq!(gpio.get_level(a4).unwrap(), PinLevel::Low);
        gpio.window_mut().poke(0x10, 1 << 4).unwrap();
        assert_eq!(gpio.get_level(a4).unwrap(), PinLevel::High);
    }

    #[test]
    fn test_invalid_bank_touches_nothing() {
        let mut gpio = controller();
        let p = PinId::new(99, 0).unwrap();

        assert!(matches!(
            gpio.set_mode(p, PinMode::Output),
            Err(GpioError::InvalidPin { bank: 99, bit: 0 })
        ));
        assert!(matches!(gpio.set_level(p, PinLevel::High), Err(GpioError::InvalidPin { .. })));
        assert!(matches!(gpio.set_pull(p, PinPull::PullUp), Err(GpioError::InvalidPin { .. })));
        assert!(matches!(gpio.get_level(p), Err(GpioError::InvalidPin { .. })));
        assert!(matches!(gpio.bank_words(9), Err(GpioError::InvalidPin { .. })));
        assert_eq!(gpio.window().write_count(), 0);
    }

    #[test]
    fn test_invalid_mode_touches_nothing() {
        let mut gpio = controller();
        let err = gpio.set_mode(pin("PA1"), PinMode::AlternateFunction(9)).unwrap_err();
        assert!(matches!(err, GpioError::InvalidMode(PinMode::AlternateFunction(9))));
        assert_eq!(gpio.window().write_count(), 0);
    }

    #[test]
    fn test_pull_and_drive_fields() {
        let mut gpio = controller();
        let p = pin("PB17");
        let bank_b = BANK_STRIDE;

        gpio.set_pull(p, PinPull::PullDown).unwrap();
        assert_eq!(gpio.window().peek(bank_b + 0x20), Some(0b10 << 2));
        assert_eq!(gpio.get_pull(p).unwrap(), PinPull::PullDown);

        gpio.set_pull(pin("PB16"), PinPull::PullUp).unwrap();
        assert_eq!(gpio.window().peek(bank_b + 0x20), Some((0b10 << 2) | 0b01));
        assert_eq!(gpio.get_pull(p).unwrap(), PinPull::PullDown);

        gpio.set_drive(p, PinDrive::new(3).unwrap()).unwrap();
        assert_eq!(gpio.window().peek(bank_b + 0x18), Some(0b11 << 2));
        assert_eq!(gpio.get_drive(p).unwrap().level(), 3);
    }

    #[test]
    fn test_bank_words() {
        let mut gpio = controller();
        gpio.window_mut().poke(2 * BANK_STRIDE + 0x10, 0xabcd).unwrap();

        let words = gpio.bank_words(2).unwrap();
        assert_eq!(words.len(), BANK_STRIDE / WORD_SIZE);
        assert_eq!(words[4], (0x10, 0xabcd));
    }

    #[test]
    fn test_window_too_small() {
        let config = chip();
        let err = PinController::new(MemoryWindow::new(0x100), &config).unwrap_err();
        assert!(matches!(err, GpioError::InvalidConfig(_)));
    }
}
