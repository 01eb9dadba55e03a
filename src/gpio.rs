//! GPIO lifecycle
//!
//! [`Gpio`] owns the chip configuration and, between `initialize()` and
//! `teardown()`, the register window with its [`PinController`]. Pin
//! operations outside that span fail with [`GpioError::NotInitialized`].
//!
//! There is no internal locking. A `Gpio` shared between threads must sit
//! behind a single lock (e.g. `Mutex<Gpio<RegisterMap>>`), since pins in one
//! bank share register words and two unsynchronized read-modify-write
//! cycles can lose an update.

use crate::config::ChipConfig;
use crate::controller::PinController;
use crate::error::{GpioError, GpioResult};
use crate::mmio::RegisterWindow;
#[cfg(unix)]
use crate::mmio::RegisterMap;
use crate::pin::{PinDrive, PinId, PinLevel, PinMode, PinPull};

/// GPIO access for one chip
#[derive(Debug)]
pub struct Gpio<W> {
    config: ChipConfig,
    controller: Option<PinController<W>>,
}

impl<W: RegisterWindow> Gpio<W> {
    /// Create an uninitialized instance
    pub fn new(config: ChipConfig) -> GpioResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            controller: None,
        })
    }

    pub fn config(&self) -> &ChipConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.controller.is_some()
    }

    /// Start using `window` for register access, releasing any window that
    /// was attached before
    pub fn attach(&mut self, window: W) -> GpioResult<()> {
        self.teardown()?;
        self.controller = Some(PinController::new(window, &self.config)?);
        Ok(())
    }

    /// Release the register window. Calling this again is a no-op.
    pub fn teardown(&mut self) -> GpioResult<()> {
        if let Some(controller) = self.controller.take() {
            controller.into_window().release()?;
            log::debug!("{}: GPIO released", self.config.name);
        }
        Ok(())
    }

    pub fn controller(&self) -> GpioResult<&PinController<W>> {
        self.controller.as_ref().ok_or(GpioError::NotInitialized)
    }

    pub fn controller_mut(&mut self) -> GpioResult<&mut PinController<W>> {
        self.controller.as_mut().ok_or(GpioError::NotInitialized)
    }

    pub fn set_mode(&mut self, pin: PinId, mode: PinMode) -> GpioResult<()> {
        self.controller_mut()?.set_mode(pin, mode)
    }

    pub fn get_mode(&self, pin: PinId) -> GpioResult<PinMode> {
        self.controller()?.get_mode(pin)
    }

    pub fn set_level(&mut self, pin: PinId, level: PinLevel) -> GpioResult<()> {
        self.controller_mut()?.set_level(pin, level)
    }

    pub fn get_level(&self, pin: PinId) -> GpioResult<PinLevel> {
        self.controller()?.get_level(pin)
    }

    pub fn set_pull(&mut self, pin: PinId, pull: PinPull) -> GpioResult<()> {
        self.controller_mut()?.set_pull(pin, pull)
    }

    pub fn get_pull(&self, pin: PinId) -> GpioResult<PinPull> {
        self.controller()?.get_pull(pin)
    }

    pub fn set_drive(&mut self, pin: PinId, drive: PinDrive) -> GpioResult<()> {
        self.controller_mut()?.set_drive(pin, drive)
    }

    pub fn get_drive(&self, pin: PinId) -> GpioResult<PinDrive> {
        self.controller()?.get_drive(pin)
    }

    pub fn bank_words(&self, bank: u8) -> GpioResult<Vec<(usize, u32)>> {
        self.controller()?.bank_words(bank)
    }
}

#[cfg(unix)]
impl Gpio<RegisterMap> {
    /// Create an instance and map the registers right away
    pub fn open(config: ChipConfig) -> GpioResult<Self> {
        let mut gpio = Self::new(config)?;
        gpio.initialize()?;
        Ok(gpio)
    }

    /// Map the controller registers. A no-op when already mapped.
    pub fn initialize(&mut self) -> GpioResult<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let map = RegisterMap::open(&self.config)?;
        self.attach(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::MemoryWindow;

    fn chip() -> ChipConfig {
        ChipConfig::new("test", 0x800, 0x400, 9, 0x24)
    }

    fn pa4() -> PinId {
        PinId::new(0, 4).unwrap()
    }

    fn assert_not_initialized<W: RegisterWindow>(gpio: &mut Gpio<W>) {
        let p = pa4();
        assert!(matches!(gpio.set_mode(p, PinMode::Output), Err(GpioError::NotInitialized)));
        assert!(matches!(gpio.get_mode(p), Err(GpioError::NotInitialized)));
        assert!(matches!(gpio.set_level(p, PinLevel::High), Err(GpioError::NotInitialized)));
        assert!(matches!(gpio.get_level(p), Err(GpioError::NotInitialized)));
        assert!(matches!(gpio.set_pull(p, PinPull::PullUp), Err(GpioError::NotInitialized)));
        assert!(matches!(gpio.get_pull(p), Err(GpioError::NotInitialized)));
        assert!(matches!(gpio.bank_words(0), Err(GpioError::NotInitialized)));
    }

    #[test]
    fn test_operations_need_initialization() {
        let mut gpio: Gpio<MemoryWindow> = Gpio::new(chip()).unwrap();
        assert!(!gpio.is_initialized());
        assert_not_initialized(&mut gpio);

        gpio.attach(MemoryWindow::for_config(&chip())).unwrap();
        gpio.set_mode(pa4(), PinMode::Output).unwrap();
        gpio.set_level(pa4(), PinLevel::High).unwrap();
        assert_eq!(gpio.get_level(pa4()).unwrap(), PinLevel::High);

        gpio.teardown().unwrap();
        assert_not_initialized(&mut gpio);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut gpio: Gpio<MemoryWindow> = Gpio::new(chip()).unwrap();
        gpio.teardown().unwrap();
        gpio.attach(MemoryWindow::for_config(&chip())).unwrap();
        gpio.teardown().unwrap();
        gpio.teardown().unwrap();
        assert!(!gpio.is_initialized());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = chip();
        config.bank_count = 0;
        assert!(matches!(Gpio::<MemoryWindow>::new(config), Err(GpioError::InvalidConfig(_))));
    }

    #[cfg(unix)]
    mod mapped {
        use super::*;
        use crate::mmio::devmem::page_size;
        use tempfile::NamedTempFile;

        fn backing_file() -> NamedTempFile {
            let file = NamedTempFile::new().unwrap();
            file.as_file().set_len(2 * page_size().unwrap() as u64).unwrap();
            file
        }

        #[test]
        fn test_initialize_and_teardown() {
            let file = backing_file();
            let mut gpio = Gpio::<RegisterMap>::new(chip().with_device(file.path())).unwrap();
            assert_not_initialized(&mut gpio);

            gpio.initialize().unwrap();
            gpio.initialize().unwrap();
            gpio.set_mode(pa4(), PinMode::Output).unwrap();
            gpio.set_level(pa4(), PinLevel::High).unwrap();
            assert_eq!(gpio.get_level(pa4()).unwrap(), PinLevel::High);

            gpio.teardown().unwrap();
            gpio.teardown().unwrap();
            assert_not_initialized(&mut gpio);

            // state lives in the backing store, so a fresh mapping sees it
            gpio.initialize().unwrap();
            assert_eq!(gpio.get_mode(pa4()).unwrap(), PinMode::Output);
            assert_eq!(gpio.get_level(pa4()).unwrap(), PinLevel::High);
        }

        #[test]
        fn test_open_failure_leaves_uninitialized() {
            let config = chip().with_device("/nonexistent/sunxi-gpio/mem");
            let mut gpio = Gpio::<RegisterMap>::new(config).unwrap();
            assert!(matches!(gpio.initialize(), Err(GpioError::Map(_))));
            assert!(!gpio.is_initialized());
            assert_not_initialized(&mut gpio);
        }

        #[test]
        fn test_mapped_gpio_is_send() {
            fn assert_send<T: Send>() {}
            assert_send::<Gpio<RegisterMap>>();
        }
    }
}
