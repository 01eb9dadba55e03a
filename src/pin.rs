//! Pin identifiers and pin configuration values
//!
//! All types here are plain values. Register encodings follow the sunxi
//! PIO controller: a 4-bit function field per pin, a single data bit, and
//! 2-bit drive and pull fields.

use std::fmt;
use std::str::FromStr;

use crate::error::{GpioError, GpioResult};

/// Pins per bank (one data register word)
pub const PINS_PER_BANK: u8 = 32;

/// Function select encodings
pub mod function {
    pub const INPUT: u32 = 0b000;
    pub const OUTPUT: u32 = 0b001;
    pub const ALT_FIRST: u8 = 2;
    pub const ALT_LAST: u8 = 6;
    pub const DISABLED: u32 = 0b111;
}

/// Pull configuration encodings
pub mod pull {
    pub const NONE: u32 = 0b00;
    pub const UP: u32 = 0b01;
    pub const DOWN: u32 = 0b10;
}

/// A pin on the controller: bank index plus bit index within that bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId {
    bank: u8,
    bit: u8,
}

impl PinId {
    /// Create a pin identifier. The bit must fit in one 32-bit register.
    ///
    /// Whether the bank exists depends on the chip and is checked by the
    /// controller, not here.
    pub fn new(bank: u8, bit: u8) -> GpioResult<Self> {
        if bit >= PINS_PER_BANK {
            return Err(GpioError::InvalidPin { bank, bit });
        }
        Ok(Self { bank, bit })
    }

    /// Decode the global sunxi pin number (`bank * 32 + bit`)
    pub fn from_number(number: u16) -> GpioResult<Self> {
        let bank = u8::try_from(number / u16::from(PINS_PER_BANK))
            .map_err(|_| GpioError::InvalidPinName(number.to_string()))?;
        Self::new(bank, (number % u16::from(PINS_PER_BANK)) as u8)
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    pub fn bit(&self) -> u8 {
        self.bit
    }

    /// Global sunxi pin number
    pub fn number(&self) -> u16 {
        u16::from(self.bank) * u16::from(PINS_PER_BANK) + u16::from(self.bit)
    }

    /// Bank letter (`A` for bank 0), if the bank has one
    pub fn bank_letter(&self) -> Option<char> {
        bank_letter(self.bank)
    }
}

/// Letter used for a bank index (`0` -> `A`)
pub fn bank_letter(bank: u8) -> Option<char> {
    (bank < 26).then(|| (b'A' + bank) as char)
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bank_letter() {
            Some(letter) => write!(f, "P{}{}", letter, self.bit),
            None => write!(f, "bank{}:{}", self.bank, self.bit),
        }
    }
}

impl FromStr for PinId {
    type Err = GpioError;

    /// Accepts `PA4`, `pa4`, `A4` or a global pin number such as `236`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let invalid = || GpioError::InvalidPinName(s.to_string());

        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            let number: u16 = name.parse().map_err(|_| invalid())?;
            return Self::from_number(number);
        }

        let upper = name.to_ascii_uppercase();
        let rest = match upper.strip_prefix('P') {
            // "P4" is not a pin, but "PA4" and the bare bank "P" (bank 15) are
            Some(r) if r.starts_with(|c: char| c.is_ascii_alphabetic()) => r,
            _ => upper.as_str(),
        };

        let mut chars = rest.chars();
        let letter = chars.next().filter(char::is_ascii_alphabetic).ok_or_else(invalid)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let bit: u8 = digits.parse().map_err(|_| invalid())?;
        Self::new(letter as u8 - b'A', bit)
    }
}

/// Pin function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
    /// Peripheral function select number (2..=6)
    AlternateFunction(u8),
    /// Pin I/O disabled
    Disabled,
}

impl PinMode {
    /// Raw function-select value. Fails for alternate functions outside 2..=6.
    pub fn encode(self) -> GpioResult<u32> {
        match self {
            PinMode::Input => Ok(function::INPUT),
            PinMode::Output => Ok(function::OUTPUT),
            PinMode::AlternateFunction(n) if (function::ALT_FIRST..=function::ALT_LAST).contains(&n) => {
                Ok(u32::from(n))
            }
            PinMode::AlternateFunction(_) => Err(GpioError::InvalidMode(self)),
            PinMode::Disabled => Ok(function::DISABLED),
        }
    }

    /// Interpret a 4-bit function field. Reserved selections (8..=15) read
    /// back as `Disabled`.
    pub fn decode(raw: u32) -> Self {
        match raw & 0xf {
            function::INPUT => PinMode::Input,
            function::OUTPUT => PinMode::Output,
            n @ 2..=6 => PinMode::AlternateFunction(n as u8),
            _ => PinMode::Disabled,
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinMode::Input => write!(f, "input"),
            PinMode::Output => write!(f, "output"),
            PinMode::AlternateFunction(n) => write!(f, "alt{}", n),
            PinMode::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for PinMode {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "in" | "input" => Ok(PinMode::Input),
            "out" | "output" => Ok(PinMode::Output),
            "off" | "disabled" | "disable" => Ok(PinMode::Disabled),
            other => {
                let n = other
                    .strip_prefix("alt")
                    .and_then(|n| n.trim().parse::<u8>().ok())
                    .ok_or_else(|| GpioError::InvalidValue(s.to_string()))?;
                let mode = PinMode::AlternateFunction(n);
                // reject unencodable functions at parse time
                mode.encode()?;
                Ok(mode)
            }
        }
    }
}

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    pub fn is_high(self) -> bool {
        self == PinLevel::High
    }
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinLevel::Low => write!(f, "low"),
            PinLevel::High => write!(f, "high"),
        }
    }
}

impl FromStr for PinLevel {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "low" | "off" => Ok(PinLevel::Low),
            "1" | "high" | "on" => Ok(PinLevel::High),
            _ => Err(GpioError::InvalidValue(s.to_string())),
        }
    }
}

/// Pull resistor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPull {
    None,
    PullUp,
    PullDown,
}

impl PinPull {
    pub fn encode(self) -> u32 {
        match self {
            PinPull::None => pull::NONE,
            PinPull::PullUp => pull::UP,
            PinPull::PullDown => pull::DOWN,
        }
    }

    /// Interpret a 2-bit pull field. The reserved value reads back as `None`.
    pub fn decode(raw: u32) -> Self {
        match raw & 0b11 {
            pull::UP => PinPull::PullUp,
            pull::DOWN => PinPull::PullDown,
            _ => PinPull::None,
        }
    }
}

impl fmt::Display for PinPull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinPull::None => write!(f, "none"),
            PinPull::PullUp => write!(f, "up"),
            PinPull::PullDown => write!(f, "down"),
        }
    }
}

impl FromStr for PinPull {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "disabled" => Ok(PinPull::None),
            "up" | "pullup" | "pull-up" => Ok(PinPull::PullUp),
            "down" | "pulldown" | "pull-down" => Ok(PinPull::PullDown),
            _ => Err(GpioError::InvalidValue(s.to_string())),
        }
    }
}

/// Output drive strength level (0 = weakest, 3 = strongest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PinDrive(u8);

impl PinDrive {
    pub const MAX: u8 = 3;

    pub fn new(level: u8) -> GpioResult<Self> {
        if level > Self::MAX {
            return Err(GpioError::InvalidValue(format!("drive level {}", level)));
        }
        Ok(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub(crate) fn encode(self) -> u32 {
        u32::from(self.0)
    }

    pub(crate) fn decode(raw: u32) -> Self {
        Self((raw & 0b11) as u8)
    }
}

impl fmt::Display for PinDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.0)
    }
}

impl FromStr for PinDrive {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = s
            .trim()
            .parse::<u8>()
            .map_err(|_| GpioError::InvalidValue(s.to_string()))?;
        Self::new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_id_rejects_wide_bit() {
        assert!(PinId::new(0, 31).is_ok());
        assert!(matches!(PinId::new(0, 32), Err(GpioError::InvalidPin { bit: 32, .. })));
    }

    #[test]
    fn test_pin_name_parsing() {
        let a4: PinId = "PA4".parse().unwrap();
        assert_eq!((a4.bank(), a4.bit()), (0, 4));
        assert_eq!("pa4".parse::<PinId>().unwrap(), a4);
        assert_eq!("A4".parse::<PinId>().unwrap(), a4);
        assert_eq!("4".parse::<PinId>().unwrap(), a4);

        let h12: PinId = "236".parse().unwrap();
        assert_eq!(h12.to_string(), "PH12");
        assert_eq!(h12.number(), 236);

        // bank P itself is a valid letter
        assert_eq!("P3".parse::<PinId>().unwrap().bank(), 15);
        assert_eq!("PP3".parse::<PinId>().unwrap().bank(), 15);
    }

    #[test]
    fn test_pin_name_errors() {
        assert!(matches!("".parse::<PinId>(), Err(GpioError::InvalidPinName(_))));
        assert!(matches!("PA".parse::<PinId>(), Err(GpioError::InvalidPinName(_))));
        assert!(matches!("PA4x".parse::<PinId>(), Err(GpioError::InvalidPinName(_))));
        assert!(matches!("PA40".parse::<PinId>(), Err(GpioError::InvalidPin { .. })));
    }

    #[test]
    fn test_mode_encoding() {
        assert_eq!(PinMode::Input.encode().unwrap(), 0);
        assert_eq!(PinMode::Output.encode().unwrap(), 1);
        assert_eq!(PinMode::AlternateFunction(4).encode().unwrap(), 4);
        assert_eq!(PinMode::Disabled.encode().unwrap(), 7);
        assert!(matches!(
            PinMode::AlternateFunction(7).encode(),
            Err(GpioError::InvalidMode(PinMode::AlternateFunction(7)))
        ));
        assert!(PinMode::AlternateFunction(1).encode().is_err());

        assert_eq!(PinMode::decode(3), PinMode::AlternateFunction(3));
        assert_eq!(PinMode::decode(0xb), PinMode::Disabled);
    }

    #[test]
    fn test_value_parsing() {
        assert_eq!("alt2".parse::<PinMode>().unwrap(), PinMode::AlternateFunction(2));
        assert_eq!("OUT".parse::<PinMode>().unwrap(), PinMode::Output);
        assert!("alt9".parse::<PinMode>().is_err());
        assert_eq!("1".parse::<PinLevel>().unwrap(), PinLevel::High);
        assert_eq!("down".parse::<PinPull>().unwrap(), PinPull::PullDown);
        assert!("4".parse::<PinDrive>().is_err());
        assert_eq!("3".parse::<PinDrive>().unwrap().level(), 3);
    }
}
