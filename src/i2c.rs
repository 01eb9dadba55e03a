//! Bit-banged I2C bus scan
//!
//! Probes each 7-bit address with a write request and records the ones
//! that pull SDA low in the acknowledge slot. Both lines are driven
//! push-pull while the controller talks, and SDA is switched to input only
//! for the ACK bit, so the bus needs pull-up resistors.

use std::ops::RangeInclusive;
use std::thread;
use std::time::Duration;

use crate::controller::PinController;
use crate::error::{GpioError, GpioResult};
use crate::mmio::RegisterWindow;
use crate::pin::{PinId, PinLevel, PinMode};

/// Addresses outside the reserved ranges at both ends of the 7-bit space
pub const SCAN_ADDRESSES: RangeInclusive<u8> = 0x08..=0x77;

/// Highest 7-bit address
const MAX_ADDRESS: u8 = 0x7f;

/// Bus timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    /// Delay between consecutive line transitions
    pub half_period: Duration,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            half_period: Duration::from_micros(5),
        }
    }
}

impl BusTiming {
    pub fn from_micros(us: u64) -> Self {
        Self {
            half_period: Duration::from_micros(us),
        }
    }
}

struct Bus<'a, W> {
    ctl: &'a mut PinController<W>,
    sda: PinId,
    scl: PinId,
    timing: BusTiming,
}

impl<W: RegisterWindow> Bus<'_, W> {
    fn delay(&self) {
        if !self.timing.half_period.is_zero() {
            thread::sleep(self.timing.half_period);
        }
    }

    fn sda(&mut self, level: PinLevel) -> GpioResult<()> {
        self.ctl.set_level(self.sda, level)?;
        self.delay();
        Ok(())
    }

    fn scl(&mut self, level: PinLevel) -> GpioResult<()> {
        self.ctl.set_level(self.scl, level)?;
        self.delay();
        Ok(())
    }

    /// SDA falls while SCL is high
    fn start(&mut self) -> GpioResult<()> {
        self.sda(PinLevel::High)?;
        self.scl(PinLevel::High)?;
        self.sda(PinLevel::Low)?;
        self.scl(PinLevel::Low)
    }

    /// SDA rises while SCL is high
    fn stop(&mut self) -> GpioResult<()> {
        self.sda(PinLevel::Low)?;
        self.scl(PinLevel::High)?;
        self.sda(PinLevel::High)
    }

    /// Clock out one byte, MSB first
    fn write_byte(&mut self, byte: u8) -> GpioResult<()> {
        for i in (0..8).rev() {
            self.sda(PinLevel::from(byte & (1 << i) != 0))?;
            self.scl(PinLevel::High)?;
            self.scl(PinLevel::Low)?;
        }
        Ok(())
    }

    /// Release SDA for one clock and report whether a device held it low.
    /// SDA is switched back to output even when sampling fails.
    fn read_ack(&mut self) -> GpioResult<bool> {
        self.ctl.set_mode(self.sda, PinMode::Input)?;
        self.delay();
        let sampled = self.sample_ack();
        self.ctl.set_mode(self.sda, PinMode::Output)?;
        Ok(sampled? == PinLevel::Low)
    }

    fn sample_ack(&mut self) -> GpioResult<PinLevel> {
        self.scl(PinLevel::High)?;
        let level = self.ctl.get_level(self.sda)?;
        self.scl(PinLevel::Low)?;
        Ok(level)
    }
}

/// Probe `addresses` on the bus formed by `sda` and `scl` and return the
/// addresses that acknowledged.
///
/// Both pins are left configured as outputs, driven high (bus idle). On
/// error both pins are still outputs but their levels are unspecified.
pub fn scan<W: RegisterWindow>(
    ctl: &mut PinController<W>,
    sda: PinId,
    scl: PinId,
    addresses: RangeInclusive<u8>,
    timing: BusTiming,
) -> GpioResult<Vec<u8>> {
    if *addresses.end() > MAX_ADDRESS {
        return Err(GpioError::InvalidValue(format!(
            "I2C address {:#04x} is wider than 7 bits",
            addresses.end()
        )));
    }
    if sda == scl {
        return Err(GpioError::InvalidValue(format!("SDA and SCL are both {}", sda)));
    }

    ctl.set_mode(sda, PinMode::Output)?;
    ctl.set_mode(scl, PinMode::Output)?;
    log::info!("scanning I2C bus (SDA {}, SCL {})", sda, scl);

    let mut bus = Bus { ctl, sda, scl, timing };
    let mut found = Vec::new();
    for address in addresses {
        bus.start()?;
        bus.write_byte(address << 1)?;
        let ack = bus.read_ack()?;
        bus.stop()?;

        if ack {
            log::debug!("device acknowledged at {:#04x}", address);
            found.push(address);
        }
    }

    Ok(found)
}
