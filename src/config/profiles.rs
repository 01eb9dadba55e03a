//! Built-in chip profiles
//!
//! All profiles share the sunxi PIO layout: 0x24 bytes per bank, with the
//! port L controller (R_PIO) left out since it lives in a separate block.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::ChipConfig;

/// PIO controller base on A10/A13/A20/H3
const SUNXI_PIO_BASE: u64 = 0x01C2_0800;

/// PIO controller base on H6
const SUN50I_H6_PIO_BASE: u64 = 0x0300_B000;

const PIO_WINDOW: usize = 0x400;
const PIO_STRIDE: usize = 0x24;

pub static SUN4I_PROFILE: Lazy<ChipConfig> = Lazy::new(|| {
    ChipConfig::new("sun4i", SUNXI_PIO_BASE, PIO_WINDOW, 9, PIO_STRIDE)
        .with_description("Allwinner A10 (ports A-I)")
});

pub static SUN7I_PROFILE: Lazy<ChipConfig> = Lazy::new(|| {
    ChipConfig::new("sun7i", SUNXI_PIO_BASE, PIO_WINDOW, 9, PIO_STRIDE)
        .with_description("Allwinner A20 (ports A-I)")
});

pub static SUN8I_H3_PROFILE: Lazy<ChipConfig> = Lazy::new(|| {
    ChipConfig::new("sun8i-h3", SUNXI_PIO_BASE, PIO_WINDOW, 7, PIO_STRIDE)
        .with_description("Allwinner H2+/H3 (ports A-G)")
});

pub static SUN50I_H6_PROFILE: Lazy<ChipConfig> = Lazy::new(|| {
    ChipConfig::new("sun50i-h6", SUN50I_H6_PIO_BASE, PIO_WINDOW, 8, PIO_STRIDE)
        .with_description("Allwinner H6 (ports A-H)")
});

/// Registry of built-in chip profiles, including aliases
pub static CHIP_PROFILES: Lazy<HashMap<&'static str, &'static ChipConfig>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("sun4i", &*SUN4I_PROFILE);
    m.insert("a10", &*SUN4I_PROFILE);
    m.insert("sun7i", &*SUN7I_PROFILE);
    m.insert("a20", &*SUN7I_PROFILE);
    m.insert("sun8i-h3", &*SUN8I_H3_PROFILE);
    m.insert("h3", &*SUN8I_H3_PROFILE);
    m.insert("sun50i-h6", &*SUN50I_H6_PROFILE);
    m.insert("h6", &*SUN50I_H6_PROFILE);
    m
});

/// Get a chip profile by name or alias
pub fn get_chip(name: &str) -> Option<&'static ChipConfig> {
    CHIP_PROFILES.get(name.to_lowercase().as_str()).copied()
}

/// Canonical profile names (aliases omitted)
pub fn chip_names() -> Vec<&'static str> {
    vec!["sun4i", "sun7i", "sun8i-h3", "sun50i-h6"]
}
