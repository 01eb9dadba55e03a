//! Chip configuration
//!
//! The physical base address, window size and register layout of the PIO
//! controller differ between SoC variants. None of it is hardcoded in the
//! mapper or the controller: a [`ChipConfig`] is injected at construction,
//! either from a built-in profile or from a TOML file.
//!
//! ```toml
//! name = "custom-a20"
//! base_address = 0x01C20800
//! window_size = 0x400
//! bank_count = 9
//! register_stride = 0x24
//! device = "/dev/mem"
//!
//! [layout]
//! config_offset = 0x00
//! data_offset = 0x10
//! drive_offset = 0x14
//! pull_offset = 0x1C
//! ```

pub mod profiles;

pub use profiles::{chip_names, get_chip, CHIP_PROFILES};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GpioError, GpioResult};

/// Default physical memory device
pub const DEFAULT_DEVICE: &str = "/dev/mem";

/// Width of one register word in bytes
pub const WORD_SIZE: usize = 4;

/// Words occupied by each register group inside a bank
pub const CONFIG_WORDS: usize = 4;
pub const DATA_WORDS: usize = 1;
pub const DRIVE_WORDS: usize = 2;
pub const PULL_WORDS: usize = 2;

/// Byte offsets of the register groups within one bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterLayout {
    /// Function select words (8 pins x 4 bits each)
    pub config_offset: usize,
    /// Data word (1 bit per pin)
    pub data_offset: usize,
    /// Drive strength words (16 pins x 2 bits each)
    pub drive_offset: usize,
    /// Pull-up/down words (16 pins x 2 bits each)
    pub pull_offset: usize,
}

impl Default for RegisterLayout {
    fn default() -> Self {
        Self {
            config_offset: 0x00,
            data_offset: 0x10,
            drive_offset: 0x14,
            pull_offset: 0x1C,
        }
    }
}

/// Chip-variant parameters for the PIO controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipConfig {
    /// Profile name
    #[serde(default = "default_name")]
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Physical address of the first bank's registers
    pub base_address: u64,
    /// Bytes mapped starting at `base_address`
    pub window_size: usize,
    /// Number of pin banks (A, B, ...)
    pub bank_count: u8,
    /// Bytes between consecutive bank register groups
    pub register_stride: usize,
    /// Memory device to map
    #[serde(default = "default_device")]
    pub device: PathBuf,
    /// Register offsets within one bank
    #[serde(default)]
    pub layout: RegisterLayout,
}

fn default_name() -> String {
    "custom".to_string()
}

fn default_device() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE)
}

impl ChipConfig {
    /// Create a configuration with the default sunxi register layout
    pub fn new(name: &str, base_address: u64, window_size: usize, bank_count: u8, register_stride: usize) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            base_address,
            window_size,
            bank_count,
            register_stride,
            device: default_device(),
            layout: RegisterLayout::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Use a different memory device (e.g. `/dev/gpiomem`)
    pub fn with_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.device = device.into();
        self
    }

    /// Parse and validate a TOML configuration
    pub fn from_toml_str(content: &str) -> GpioResult<Self> {
        let config: ChipConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> GpioResult<Self> {
        let content = fs::read_to_string(path)?;
        log::debug!("loading chip configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Bytes needed to cover every bank's register group
    pub fn required_window(&self) -> GpioResult<usize> {
        usize::from(self.bank_count)
            .checked_mul(self.register_stride)
            .ok_or_else(|| {
                GpioError::InvalidConfig(format!(
                    "{} banks x {:#x} stride overflow the address space",
                    self.bank_count, self.register_stride
                ))
            })
    }

    /// Check that every register the controller may touch lies inside the
    /// window and is word aligned
    pub fn validate(&self) -> GpioResult<()> {
        let fail = |msg: String| -> GpioResult<()> { Err(GpioError::InvalidConfig(msg)) };

        if self.base_address % WORD_SIZE as u64 != 0 {
            return fail(format!("base_address {:#x} is not word aligned", self.base_address));
        }
        if self.bank_count == 0 {
            return fail("bank_count must be at least 1".into());
        }
        if self.window_size == 0 || self.window_size % WORD_SIZE != 0 {
            return fail(format!("window_size {:#x} must be a non-zero multiple of 4", self.window_size));
        }
        if self.register_stride == 0 || self.register_stride % WORD_SIZE != 0 {
            return fail(format!(
                "register_stride {:#x} must be a non-zero multiple of 4",
                self.register_stride
            ));
        }
        if self.required_window()? > self.window_size {
            return fail(format!(
                "{} banks x {:#x} stride exceed the {:#x}-byte window",
                self.bank_count, self.register_stride, self.window_size
            ));
        }

        let groups = [
            ("config_offset", self.layout.config_offset, CONFIG_WORDS),
            ("data_offset", self.layout.data_offset, DATA_WORDS),
            ("drive_offset", self.layout.drive_offset, DRIVE_WORDS),
            ("pull_offset", self.layout.pull_offset, PULL_WORDS),
        ];
        for (field, offset, words) in groups {
            if offset % WORD_SIZE != 0 {
                return fail(format!("{} {:#x} is not word aligned", field, offset));
            }
            let fits = offset
                .checked_add(words * WORD_SIZE)
                .is_some_and(|end| end <= self.register_stride);
            if !fits {
                return fail(format!(
                    "{} {:#x} ({} words) does not fit in the {:#x}-byte bank stride",
                    field, offset, words, self.register_stride
                ));
            }
        }

        Ok(())
    }
}
