//! sunxi-gpio
//!
//! Command-line access to GPIO pins on Allwinner (sunxi) boards through the
//! memory-mapped PIO controller.
//!
//! # Usage
//!
//! ```bash
//! # List built-in chip profiles
//! sunxi-gpio chips list
//!
//! # Configure PA4 as an output and drive it high
//! sudo sunxi-gpio --chip sun8i-h3 mode PA4 out
//! sudo sunxi-gpio --chip sun8i-h3 write PA4 high
//!
//! # Read a pin, enable its pull-up
//! sudo sunxi-gpio read PG7
//! sudo sunxi-gpio pull PG7 up
//!
//! # Dump bank H registers
//! sudo sunxi-gpio dump H
//!
//! # Scan a bit-banged I2C bus
//! sudo sunxi-gpio i2c-scan --sda PH12 --scl PH11
//!
//! # Use a custom chip description
//! sudo sunxi-gpio --config board.toml read PA1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use sunxi_gpio::config::{chip_names, get_chip, ChipConfig, RegisterLayout, WORD_SIZE};
use sunxi_gpio::i2c::{self, BusTiming, SCAN_ADDRESSES};
use sunxi_gpio::pin::bank_letter;
use sunxi_gpio::{Gpio, PinDrive, PinId, PinLevel, PinMode, PinPull, RegisterMap};

/// Allwinner GPIO control
///
/// Drives GPIO pins through the memory-mapped PIO controller
#[derive(Parser)]
#[command(name = "sunxi-gpio")]
#[command(version)]
#[command(about = "Control GPIO pins on Allwinner (sunxi) SoC boards")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Chip profile (see `chips list`)
    #[arg(short, long, global = true, default_value = "sun7i")]
    chip: String,

    /// Chip configuration file (TOML), overrides --chip
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chip profile operations
    #[command(subcommand)]
    Chips(ChipCommands),

    /// Show or set a pin's function (in, out, alt2..alt6, off)
    Mode {
        /// Pin name (e.g., PA4) or number
        pin: PinId,
        /// New function
        mode: Option<PinMode>,
    },

    /// Read a pin's level
    Read {
        /// Pin name (e.g., PA4) or number
        pin: PinId,
    },

    /// Drive an output pin
    Write {
        /// Pin name (e.g., PA4) or number
        pin: PinId,
        /// high/low (or 1/0)
        level: PinLevel,
        /// Configure the pin as an output first
        #[arg(long)]
        configure: bool,
    },

    /// Show or set a pin's pull resistor (none, up, down)
    Pull {
        /// Pin name (e.g., PA4) or number
        pin: PinId,
        /// New pull setting
        pull: Option<PinPull>,
    },

    /// Show or set a pin's drive strength (0-3)
    Drive {
        /// Pin name (e.g., PA4) or number
        pin: PinId,
        /// New drive level
        level: Option<PinDrive>,
    },

    /// Dump bank registers
    Dump {
        /// Bank letter or index (default: all banks)
        bank: Option<String>,
    },

    /// Scan a bit-banged I2C bus for devices
    I2cScan {
        /// Data line
        #[arg(long, default_value = "PH12")]
        sda: PinId,
        /// Clock line
        #[arg(long, default_value = "PH11")]
        scl: PinId,
        /// Half clock period in microseconds
        #[arg(long, default_value_t = 5)]
        delay_us: u64,
    },
}

#[derive(Subcommand)]
enum ChipCommands {
    /// List built-in chip profiles
    List,

    /// Show a chip profile
    Show {
        /// Profile name (e.g., sun7i, h3)
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Commands::Chips(cmd) = &cli.command {
        return handle_chips(cmd);
    }

    let chip = load_chip(&cli)?;
    let name = chip.name.clone();
    let mut gpio = Gpio::open(chip)
        .with_context(|| format!("Failed to map GPIO registers for {} (root required)", name))?;

    let result = handle_pins(&cli.command, &mut gpio);
    gpio.teardown().context("Failed to release GPIO registers")?;
    result
}

fn load_chip(cli: &Cli) -> Result<ChipConfig> {
    if let Some(path) = &cli.config {
        return ChipConfig::load(path)
            .with_context(|| format!("Failed to load chip configuration: {}", path.display()));
    }

    get_chip(&cli.chip).cloned().ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown chip profile: {}. Use 'sunxi-gpio chips list' to see available profiles.",
            cli.chip
        )
    })
}

fn handle_chips(cmd: &ChipCommands) -> Result<()> {
    match cmd {
        ChipCommands::List => {
            println!("{}", "=".repeat(60));
            println!("{}", "Supported Chip Profiles".cyan().bold());
            println!("{}", "=".repeat(60));

            for name in chip_names() {
                if let Some(chip) = get_chip(name) {
                    println!("\n  {}: {}", name.white().bold(), chip.description);
                    println!("    PIO base: {:#010x}", chip.base_address);
                    println!("    Banks: {}", chip.bank_count);
                }
            }

            println!("\n{}", "=".repeat(60));
            println!(
                "Use {} to see detailed profile information",
                "sunxi-gpio chips show <chip>".cyan()
            );
        }

        ChipCommands::Show { name } => {
            let profile = get_chip(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown chip profile: {}. Use 'sunxi-gpio chips list' to see available profiles.",
                    name
                )
            })?;
            print_chip(profile);
        }
    }

    Ok(())
}

fn print_chip(chip: &ChipConfig) {
    println!("{}", "=".repeat(60));
    println!("{}", format!("Chip Profile: {}", chip.name).cyan().bold());
    println!("{}", "=".repeat(60));

    println!("\n{}", "Controller:".white().bold());
    println!("  Description: {}", chip.description);
    println!("  Base address: {:#010x}", chip.base_address);
    println!("  Window size: {:#x}", chip.window_size);
    println!("  Device: {}", chip.device.display());

    let last = chip.bank_count.saturating_sub(1);
    println!("\n{}", "Banks:".white().bold());
    println!(
        "  {} banks (P{}..P{}), stride {:#x}",
        chip.bank_count,
        bank_letter(0).unwrap_or('?'),
        bank_letter(last).unwrap_or('?'),
        chip.register_stride
    );

    let layout = &chip.layout;
    println!("\n{}", "Register Layout:".white().bold());
    println!("  CFG0..3:  +{:#04x}", layout.config_offset);
    println!("  DAT:      +{:#04x}", layout.data_offset);
    println!("  DRV0..1:  +{:#04x}", layout.drive_offset);
    println!("  PULL0..1: +{:#04x}", layout.pull_offset);

    println!("\n{}", "=".repeat(60));
}

fn handle_pins(cmd: &Commands, gpio: &mut Gpio<RegisterMap>) -> Result<()> {
    match cmd {
        Commands::Chips(cmd) => handle_chips(cmd)?,

        Commands::Mode { pin, mode } => {
            if let Some(mode) = mode {
                gpio.set_mode(*pin, *mode)?;
                println!("{} {} -> {}", "[OK]".green().bold(), pin, mode);
            } else {
                println!("{}: {}", pin.to_string().white().bold(), gpio.get_mode(*pin)?);
            }
        }

        Commands::Read { pin } => {
            let level = gpio.get_level(*pin)?;
            let shown = match level {
                PinLevel::High => "high".green(),
                PinLevel::Low => "low".red(),
            };
            println!("{}: {}", pin.to_string().white().bold(), shown);
        }

        Commands::Write { pin, level, configure } => {
            if *configure {
                gpio.set_mode(*pin, PinMode::Output)?;
            }
            gpio.set_level(*pin, *level).with_context(|| {
                format!("Cannot drive {} (use --configure to switch it to output)", pin)
            })?;
            println!("{} {} -> {}", "[OK]".green().bold(), pin, level);
        }

        Commands::Pull { pin, pull } => {
            if let Some(pull) = pull {
                gpio.set_pull(*pin, *pull)?;
                println!("{} {} pull -> {}", "[OK]".green().bold(), pin, pull);
            } else {
                println!("{} pull: {}", pin.to_string().white().bold(), gpio.get_pull(*pin)?);
            }
        }

        Commands::Drive { pin, level } => {
            if let Some(level) = level {
                gpio.set_drive(*pin, *level)?;
                println!("{} {} drive -> {}", "[OK]".green().bold(), pin, level);
            } else {
                println!("{} drive: {}", pin.to_string().white().bold(), gpio.get_drive(*pin)?);
            }
        }

        Commands::Dump { bank } => {
            let banks = match bank {
                Some(b) => vec![parse_bank(b)?],
                None => (0..gpio.config().bank_count).collect(),
            };
            let layout = gpio.config().layout;
            for bank in banks {
                print_bank(gpio, bank, &layout)?;
            }
        }

        Commands::I2cScan { sda, scl, delay_us } => {
            println!(
                "{} Scanning I2C bus (SDA {}, SCL {})...",
                "[*]".cyan().bold(),
                sda,
                scl
            );

            let found = i2c::scan(
                gpio.controller_mut()?,
                *sda,
                *scl,
                SCAN_ADDRESSES,
                BusTiming::from_micros(*delay_us),
            )?;

            if found.is_empty() {
                println!("{}", "No devices acknowledged".yellow());
            } else {
                for address in &found {
                    println!("  Device found at address {}", format!("{:#04x}", address).white().bold());
                }
                println!("\n{} {} device(s) found", "[OK]".green().bold(), found.len());
            }
        }
    }

    Ok(())
}

/// Parse a bank given as a letter (`H`, `PH`) or an index (`7`)
fn parse_bank(s: &str) -> Result<u8> {
    let upper = s.trim().to_ascii_uppercase();
    if let Ok(index) = upper.parse::<u8>() {
        return Ok(index);
    }

    let letter = upper.strip_prefix('P').filter(|r| !r.is_empty()).unwrap_or(&upper);
    match letter.as_bytes() {
        [c @ b'A'..=b'Z'] => Ok(c - b'A'),
        _ => anyhow::bail!("Invalid bank: {} (expected a letter such as H or an index)", s),
    }
}

fn register_name(offset: usize, layout: &RegisterLayout) -> String {
    let group = |base: usize, words: usize, name: &str| {
        (base..base + words * WORD_SIZE)
            .step_by(WORD_SIZE)
            .position(|o| o == offset)
            .map(|i| if words == 1 { name.to_string() } else { format!("{}{}", name, i) })
    };

    group(layout.config_offset, 4, "CFG")
        .or_else(|| group(layout.data_offset, 1, "DAT"))
        .or_else(|| group(layout.drive_offset, 2, "DRV"))
        .or_else(|| group(layout.pull_offset, 2, "PULL"))
        .unwrap_or_else(|| "-".to_string())
}

fn print_bank(gpio: &Gpio<RegisterMap>, bank: u8, layout: &RegisterLayout) -> Result<()> {
    let words = gpio.bank_words(bank)?;
    let base = usize::from(bank) * gpio.config().register_stride;

    println!(
        "\n{} (offset {:#05x})",
        format!("Bank P{}", bank_letter(bank).unwrap_or('?')).cyan().bold(),
        base
    );
    for (offset, value) in words {
        println!(
            "  +{:#04x}  {:<6} {}",
            offset,
            register_name(offset, layout),
            format!("{:#010x}", value).white()
        );
    }
    Ok(())
}
