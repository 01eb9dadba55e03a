//! Memory-mapped GPIO control for Allwinner (sunxi) SoCs
//!
//! Maps the PIO controller's register block from `/dev/mem` and drives pins
//! through read-modify-write cycles on the bank registers.
//!
//! # Architecture
//!
//! ```text
//!   CLI / scripting adapter
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │    Gpio     │  initialize / teardown
//!     └──────┬──────┘
//!            ▼
//!     ┌─────────────┐
//!     │    Pin      │  bank/bit -> register field
//!     │ Controller  │
//!     └──────┬──────┘
//!            ▼
//!     ┌─────────────┐
//!     │  Register   │  aligned, bounds-checked
//!     │   Window    │  volatile word access
//!     └──────┬──────┘
//!            ▼
//!       PIO registers
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use sunxi_gpio::{get_chip, Gpio, PinId, PinLevel, PinMode};
//!
//! # fn main() -> sunxi_gpio::GpioResult<()> {
//! let chip = get_chip("sun7i").unwrap().clone();
//! let mut gpio = Gpio::open(chip)?;
//!
//! let led: PinId = "PH20".parse()?;
//! gpio.set_mode(led, PinMode::Output)?;
//! gpio.set_level(led, PinLevel::High)?;
//!
//! gpio.teardown()?;
//! # Ok(())
//! # }
//! ```
//!
//! Mapping `/dev/mem` needs root (or `CAP_SYS_RAWIO`).

pub mod config;
pub mod controller;
pub mod error;
pub mod gpio;
pub mod i2c;
pub mod mmio;
pub mod pin;

pub use config::{chip_names, get_chip, ChipConfig, RegisterLayout};
pub use controller::PinController;
pub use error::{GpioError, GpioResult, MapError};
pub use gpio::Gpio;
#[cfg(unix)]
pub use mmio::RegisterMap;
pub use mmio::{MemoryWindow, RegisterWindow};
pub use pin::{PinDrive, PinId, PinLevel, PinMode, PinPull};
