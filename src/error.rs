//! Error types for GPIO access
//!
//! Every failure is returned to the immediate caller. Only a [`MapError`]
//! leaves the library unusable, and only until the mapping is re-established.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pin::{PinId, PinMode};

/// Result alias used throughout the crate
pub type GpioResult<T> = Result<T, GpioError>;

/// Failure to acquire or release the physical memory window
#[derive(Error, Debug)]
pub enum MapError {
    /// The memory device could not be opened (usually insufficient privilege)
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `mmap` refused the requested range
    #[error("cannot map {len:#x} bytes at physical address {address:#010x}: {source}")]
    Mmap {
        address: u64,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// `munmap` failed while releasing the window
    #[error("cannot unmap register window: {source}")]
    Unmap {
        #[source]
        source: io::Error,
    },

    /// The system page size could not be determined
    #[error("cannot determine system page size")]
    PageSize,
}

/// Errors returned by register and pin operations
#[derive(Error, Debug)]
pub enum GpioError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error("GPIO registers are not mapped; call initialize() first")]
    NotInitialized,

    /// A register offset fell outside the window or was not word aligned.
    /// This points at a layout bug, not at caller input.
    #[error("register offset {offset:#x} is outside the {window_size:#x}-byte window or unaligned")]
    OutOfRange { offset: usize, window_size: usize },

    #[error("pin bank {bank} bit {bit} does not exist on this chip")]
    InvalidPin { bank: u8, bit: u8 },

    #[error("cannot parse pin name '{0}' (expected e.g. PA4, A4 or 4)")]
    InvalidPinName(String),

    #[error("pin mode {0:?} cannot be encoded")]
    InvalidMode(PinMode),

    #[error("invalid value '{0}'")]
    InvalidValue(String),

    #[error("pin {pin} is configured as {mode}, not as an output")]
    WrongMode { pin: PinId, mode: PinMode },

    #[error("invalid chip configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot parse chip configuration")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
