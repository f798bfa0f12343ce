//! Build script for syntonic-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// GPIO the firmware wires to I2C1 SDA
const WIRED_SDA: i64 = 6;
/// GPIO the firmware wires to I2C1 SCL
const WIRED_SCL: i64 = 7;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate board.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a board.toml configuration file.          ║\n\
            ║  Please create one in the syntonic-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_i2c(&config, &mut errors);
    validate_transport(&config, &mut errors);
    validate_si5351(&config, &mut errors);
    validate_console(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid board configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=board.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Only the known sections, each a table
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        return;
    };
    for (name, value) in root {
        if !["i2c", "transport", "si5351", "console"].contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
        } else if !value.is_table() {
            errors.push(format!("[{}] must be a table", name));
        }
    }
}

/// Integer `key` of `section`, if present
fn int(config: &toml::Value, section: &str, key: &str) -> Option<i64> {
    config.get(section)?.get(key)?.as_integer()
}

/// Require an integer in `range` when the key is present
fn check_range(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    let Some(value) = config.get(section).and_then(|s| s.get(key)) else {
        return;
    };
    match value.as_integer() {
        Some(n) if range.contains(&n) => {}
        Some(_) => errors.push(format!(
            "[{}] {} must be {}-{}",
            section,
            key,
            range.start(),
            range.end()
        )),
        None => errors.push(format!("[{}] {} must be an integer", section, key)),
    }
}

/// Pin number of a Klipper-style pin string ("gpio6", "^gpio6")
fn pin_number(value: &str) -> Option<i64> {
    let value = value.strip_prefix('^').unwrap_or(value);
    let number: i64 = value.strip_prefix("gpio")?.parse().ok()?;
    (0..30).contains(&number).then_some(number)
}

fn validate_i2c(config: &toml::Value, errors: &mut Vec<String>) {
    for (key, wired) in [("sda_pin", WIRED_SDA), ("scl_pin", WIRED_SCL)] {
        let Some(value) = config.get("i2c").and_then(|s| s.get(key)) else {
            continue;
        };
        match value.as_str().map(pin_number) {
            Some(Some(pin)) if pin == wired => {}
            Some(Some(pin)) => errors.push(format!(
                "[i2c] {} is gpio{}, board is wired to gpio{}",
                key, pin, wired
            )),
            _ => errors.push(format!("[i2c] {} must be a pin like \"^gpio{}\"", key, wired)),
        }
    }
    check_range(config, "i2c", "speed_hz", 10_000..=1_000_000, errors);
}

fn validate_transport(config: &toml::Value, errors: &mut Vec<String>) {
    for key in [
        "op_timeout_us",
        "probe_timeout_us",
        "retry_window_ms",
        "retry_interval_ms",
        "reset_settle_ms",
    ] {
        check_range(config, "transport", key, 1..=1_000_000, errors);
    }
}

fn validate_si5351(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "si5351", "address", 0x08..=0x77, errors);
    check_range(config, "si5351", "xtal_hz", 10_000_000..=40_000_000, errors);
    check_range(config, "si5351", "pll_hz", 600_000_000..=900_000_000, errors);
    check_range(config, "si5351", "clk0_default_mhz", 0..=150, errors);
    check_range(config, "si5351", "max_output_hz", 1..=200_000_000, errors);

    if let Some(pf) = int(config, "si5351", "crystal_load_pf") {
        if ![6, 8, 10].contains(&pf) {
            errors.push("[si5351] crystal_load_pf must be 6, 8 or 10".to_string());
        }
    }

    let xtal = int(config, "si5351", "xtal_hz").unwrap_or(25_000_000);
    let pll = int(config, "si5351", "pll_hz").unwrap_or(800_000_000);
    if xtal > 0 && (pll % xtal != 0 || !(15..=90).contains(&(pll / xtal))) {
        errors.push("[si5351] pll_hz must be 15-90 times xtal_hz".to_string());
    }
}

fn validate_console(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "console", "led_blink_ms", 1..=10_000, errors);
}
