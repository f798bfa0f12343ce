//! Simple TOML parser for board configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the board file. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer)
//! - Decimal and `0x` hexadecimal integers, with `_` separators
//! - [section] headers
//! - Comments (# ...)
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Booleans, floats and datetime values
//! - Dotted keys

use crate::si5351::CrystalLoad;

use super::types::{BoardConfig, PinConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value of the wrong type or unparseable
    InvalidValue,
    /// Value parsed but outside the accepted range
    OutOfRange,
    /// Invalid pin string
    InvalidPin,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    I2c,
    Transport,
    Si5351,
    Console,
}

/// Parse TOML configuration into BoardConfig
pub fn parse_config(input: &str) -> Result<BoardConfig, ParseError> {
    let mut config = BoardConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') {
                return Err(ParseError::InvalidSection);
            }
            section = parse_section_header(&header[1..header.len() - 1])?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "i2c" => Ok(Section::I2c),
        "transport" => Ok(Section::Transport),
        "si5351" => Ok(Section::Si5351),
        "console" => Ok(Section::Console),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing comment that is not inside a string
fn strip_comment(text: &str) -> &str {
    match text.find('#') {
        Some(hash_pos) if text[..hash_pos].matches('"').count() % 2 == 0 => {
            text[..hash_pos].trim()
        }
        _ => text,
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

/// Parse an unsigned integer: decimal or `0x` hex, `_` allowed between digits
fn parse_int(value: &str) -> Result<u32, ParseError> {
    let (digits, radix) = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (value, 10),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
        return Err(ParseError::InvalidValue);
    }

    let mut result: u32 = 0;
    for c in digits.chars().filter(|&c| c != '_') {
        let digit = c.to_digit(radix).ok_or(ParseError::InvalidValue)?;
        result = result
            .checked_mul(radix)
            .and_then(|r| r.checked_add(digit))
            .ok_or(ParseError::OutOfRange)?;
    }
    Ok(result)
}

fn parse_u8(value: &str) -> Result<u8, ParseError> {
    u8::try_from(parse_int(value)?).map_err(|_| ParseError::OutOfRange)
}

/// Parse a pin string like "gpio6" or "^gpio6"
///
/// `^` enables the internal pull-up. Inversion (`!`) has no meaning on an
/// I2C line and is rejected.
pub fn parse_pin(value: &str) -> Result<PinConfig, ParseError> {
    let mut s = parse_string(value);
    let mut pull_up = false;

    if let Some(rest) = s.strip_prefix('^') {
        pull_up = true;
        s = rest;
    }

    let number = s.strip_prefix("gpio").ok_or(ParseError::InvalidPin)?;
    let pin: u8 = number.parse().map_err(|_| ParseError::InvalidPin)?;

    Ok(PinConfig { pin, pull_up })
}

/// Megahertz value converted to hertz
fn parse_mhz(value: &str) -> Result<u32, ParseError> {
    parse_int(value)?
        .checked_mul(1_000_000)
        .ok_or(ParseError::OutOfRange)
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut BoardConfig,
) -> Result<(), ParseError> {
    match section {
        Section::I2c => {
            let i2c = &mut config.i2c;
            match key {
                "sda_pin" => i2c.sda_pin = parse_pin(value)?,
                "scl_pin" => i2c.scl_pin = parse_pin(value)?,
                "speed_hz" => i2c.speed_hz = parse_int(value)?,
                _ => {} // Ignore unknown keys
            }
        }
        Section::Transport => {
            let transport = &mut config.transport;
            match key {
                "op_timeout_us" => transport.op_timeout_us = parse_int(value)?,
                "probe_timeout_us" => transport.probe_timeout_us = parse_int(value)?,
                "retry_window_ms" => transport.retry_window_ms = parse_int(value)?,
                "retry_interval_ms" => transport.retry_interval_ms = parse_int(value)?,
                "reset_settle_ms" => transport.reset_settle_ms = parse_int(value)?,
                _ => {}
            }
        }
        Section::Si5351 => {
            let chip = &mut config.si5351;
            match key {
                "address" => chip.address = parse_u8(value)?,
                "xtal_hz" => chip.xtal_hz = parse_int(value)?,
                "pll_hz" => chip.pll_hz = parse_int(value)?,
                "crystal_load_pf" => {
                    chip.crystal_load =
                        CrystalLoad::from_pf(parse_u8(value)?).ok_or(ParseError::OutOfRange)?
                }
                "clk0_default_mhz" => chip.default_hz = parse_mhz(value)?,
                "max_output_hz" => chip.max_output_hz = parse_int(value)?,
                _ => {}
            }
        }
        Section::Console => {
            if key == "led_blink_ms" {
                config.console.led_blink_ms = parse_int(value)?;
            }
        }
        Section::Root => {
            // Keys before the first section are ignored
        }
    }

    Ok(())
}

/// Cross-field checks the individual parsers cannot do
fn validate(config: &BoardConfig) -> Result<(), ParseError> {
    if !config.i2c.hal_config().is_supported_speed() {
        return Err(ParseError::OutOfRange);
    }
    if config.i2c.sda_pin.pin == config.i2c.scl_pin.pin {
        return Err(ParseError::InvalidPin);
    }
    if config.si5351.address > 0x7F {
        return Err(ParseError::OutOfRange);
    }
    let t = &config.transport;
    if t.op_timeout_us == 0 || t.probe_timeout_us == 0 || t.retry_interval_ms == 0 {
        return Err(ParseError::OutOfRange);
    }
    if config.console.led_blink_ms == 0 {
        return Err(ParseError::OutOfRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin() {
        let pin = parse_pin("gpio6").unwrap();
        assert_eq!(pin.pin, 6);
        assert!(!pin.pull_up);

        let pin = parse_pin("\"^gpio7\"").unwrap();
        assert_eq!(pin.pin, 7);
        assert!(pin.pull_up);

        assert_eq!(parse_pin("!gpio7"), Err(ParseError::InvalidPin));
        assert_eq!(parse_pin("pin7"), Err(ParseError::InvalidPin));
        assert_eq!(parse_pin("gpio"), Err(ParseError::InvalidPin));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("100000"), Ok(100_000));
        assert_eq!(parse_int("800_000_000"), Ok(800_000_000));
        assert_eq!(parse_int("0x60"), Ok(0x60));
        assert_eq!(parse_int("0XB7"), Ok(0xB7));
        assert_eq!(parse_int("0x"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int("12a"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int("-1"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int("_1"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int("5000000000"), Err(ParseError::OutOfRange));
        assert_eq!(parse_u8("0x100"), Err(ParseError::OutOfRange));
    }

    #[test]
    fn test_parse_key_value_strips_comment() {
        assert_eq!(
            parse_key_value("speed_hz = 400000 # fast mode"),
            Some(("speed_hz", "400000"))
        );
        assert_eq!(
            parse_key_value("sda_pin = \"^gpio6\""),
            Some(("sda_pin", "\"^gpio6\""))
        );
        assert_eq!(parse_key_value("key ="), None);
    }

    #[test]
    fn test_empty_input_is_default() {
        assert_eq!(parse_config(""), Ok(BoardConfig::default()));
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
# XIAO RP2040 + Si5351A breakout
[i2c]
sda_pin = "^gpio6"
scl_pin = "^gpio7"
speed_hz = 400_000

[transport]
op_timeout_us = 2000
probe_timeout_us = 1000
retry_window_ms = 30
retry_interval_ms = 2
reset_settle_ms = 50

[si5351]
address = 0x61
xtal_hz = 27_000_000
pll_hz = 864_000_000   # 32 x 27 MHz
crystal_load_pf = 10
clk0_default_mhz = 100
max_output_hz = 150_000_000

[console]
led_blink_ms = 500
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.i2c.sda_pin, PinConfig::with_pullup(6));
        assert_eq!(config.i2c.scl_pin.pin, 7);
        assert_eq!(config.i2c.speed_hz, 400_000);
        assert_eq!(config.transport.retry_window_ms, 30);
        assert_eq!(config.si5351.address, 0x61);
        assert_eq!(config.si5351.xtal_hz, 27_000_000);
        assert_eq!(config.si5351.pll_hz, 864_000_000);
        assert_eq!(config.si5351.crystal_load, CrystalLoad::Pf10);
        assert_eq!(config.si5351.default_hz, 100_000_000);
        assert_eq!(config.console.led_blink_ms, 500);
    }

    #[test]
    fn test_pin_pull_ups_reach_hal_config() {
        let config = parse_config("[i2c]\nsda_pin = \"^gpio6\"\nscl_pin = \"gpio7\"").unwrap();
        let hal = config.i2c.hal_config();
        assert_eq!((hal.sda_pin, hal.scl_pin), (6, 7));
        assert!(hal.sda_pull_up);
        assert!(!hal.scl_pull_up);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert_eq!(
            parse_config("[spi]\nspeed_hz = 1"),
            Err(ParseError::InvalidSection)
        );
        assert_eq!(parse_config("[i2c"), Err(ParseError::InvalidSection));
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(
            parse_config("[i2c]\nspeed_hz = 5000000"),
            Err(ParseError::OutOfRange)
        );
        assert_eq!(
            parse_config("[si5351]\ncrystal_load_pf = 7"),
            Err(ParseError::OutOfRange)
        );
        assert_eq!(
            parse_config("[si5351]\naddress = 0x80"),
            Err(ParseError::OutOfRange)
        );
        assert_eq!(
            parse_config("[i2c]\nsda_pin = \"gpio7\""),
            Err(ParseError::InvalidPin)
        );
    }
}
