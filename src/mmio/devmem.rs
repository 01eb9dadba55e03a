//! PIO registers mapped from a physical memory device
//!
//! The mapping starts at the page containing the configured base address;
//! the offset of the base within that page is added to every access.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr::{self, NonNull};

use super::{check_offset, RegisterWindow};
use crate::config::ChipConfig;
use crate::error::{GpioError, GpioResult, MapError};

/// System page size
pub(crate) fn page_size() -> GpioResult<usize> {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return Err(MapError::PageSize.into());
    }
    Ok(size as usize)
}

/// Mapped GPIO controller registers
///
/// The mapping is released by [`RegisterMap::close`] or, failing that,
/// when the value is dropped.
#[derive(Debug)]
pub struct RegisterMap {
    /// Start of the page-aligned mapping, `None` once closed
    mapping: Option<NonNull<libc::c_void>>,
    /// Length passed to mmap
    map_len: usize,
    /// Offset of the window inside the mapping
    page_offset: usize,
    window_size: usize,
    base_address: u64,
}

// The mapping is owned exclusively; writes require `&mut self`.
unsafe impl Send for RegisterMap {}

impl RegisterMap {
    /// Map `config.window_size` bytes at `config.base_address` from
    /// `config.device`
    pub fn open(config: &ChipConfig) -> GpioResult<Self> {
        config.validate()?;

        let page_size = page_size()?;
        let map_start = config.base_address & !(page_size as u64 - 1);
        let page_offset = (config.base_address - map_start) as usize;
        let map_len = page_offset
            .checked_add(config.window_size)
            .and_then(|end| end.div_ceil(page_size).checked_mul(page_size))
            .ok_or_else(|| {
                GpioError::InvalidConfig(format!(
                    "window of {:#x} bytes at {:#x} overflows the address space",
                    config.window_size, config.base_address
                ))
            })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&config.device)
            .map_err(|source| MapError::Open {
                path: config.device.clone(),
                source,
            })?;

        let file_offset = libc::off_t::try_from(map_start).map_err(|_| {
            GpioError::InvalidConfig(format!(
                "base address {:#x} is beyond the mappable range",
                config.base_address
            ))
        })?;

        // SAFETY: fresh mapping chosen by the kernel; the descriptor is valid
        // for the duration of the call and may be closed afterwards
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                file_offset,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(MapError::Mmap {
                address: map_start,
                len: map_len,
                source: io::Error::last_os_error(),
            }
            .into());
        }
        drop(file);

        let mapping = NonNull::new(addr).ok_or_else(|| MapError::Mmap {
            address: map_start,
            len: map_len,
            source: io::Error::new(io::ErrorKind::Other, "mmap returned a null mapping"),
        })?;

        log::info!(
            "mapped {:#x} bytes of {} at {:#010x} (window {:#x} at +{:#x})",
            map_len,
            config.device.display(),
            map_start,
            config.window_size,
            page_offset
        );

        Ok(Self {
            mapping: Some(mapping),
            map_len,
            page_offset,
            window_size: config.window_size,
            base_address: config.base_address,
        })
    }

    /// Whether the mapping is still in place
    pub fn is_open(&self) -> bool {
        self.mapping.is_some()
    }

    /// Physical address of byte 0 of the window
    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Release the mapping. Calling this again is a no-op.
    pub fn close(&mut self) -> GpioResult<()> {
        let Some(mapping) = self.mapping.take() else {
            return Ok(());
        };

        // SAFETY: mapping and map_len come from the successful mmap in open(),
        // and taking the Option guarantees it is unmapped only once
        let rc = unsafe { libc::munmap(mapping.as_ptr(), self.map_len) };
        if rc != 0 {
            return Err(MapError::Unmap {
                source: io::Error::last_os_error(),
            }
            .into());
        }

        log::info!("unmapped GPIO registers at {:#010x}", self.base_address);
        Ok(())
    }

    fn word_ptr(&self, offset: usize) -> GpioResult<*mut u32> {
        let mapping = self.mapping.ok_or(GpioError::NotInitialized)?;
        check_offset(offset, self.window_size)?;
        // SAFETY: page_offset + offset + 4 <= map_len by construction and
        // check_offset; open() rejects word-unaligned base addresses, so the
        // result is word aligned
        let ptr = unsafe { mapping.as_ptr().cast::<u8>().add(self.page_offset + offset) };
        Ok(ptr.cast::<u32>())
    }
}

impl RegisterWindow for RegisterMap {
    fn size(&self) -> usize {
        self.window_size
    }

    fn read_word(&self, offset: usize) -> GpioResult<u32> {
        let reg = self.word_ptr(offset)?;
        // SAFETY: reg is in bounds, aligned, and backed by a live mapping
        Ok(unsafe { ptr::read_volatile(reg) })
    }

    fn write_word(&mut self, offset: usize, value: u32) -> GpioResult<()> {
        let reg = self.word_ptr(offset)?;
        // SAFETY: as in read_word
        unsafe { ptr::write_volatile(reg, value) };
        Ok(())
    }

    fn release(&mut self) -> GpioResult<()> {
        self.close()
    }
}

impl Drop for RegisterMap {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to release GPIO mapping: {}", e);
        }
    }
}
