//! Board configuration types
//!
//! Every field has a default so a partial `board.toml` still yields a
//! complete configuration.

use syntonic_hal::I2cConfig;

use crate::si5351::EngineConfig;
use crate::transport::TransportConfig;

/// GPIO pin with optional pull-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// GPIO number
    pub pin: u8,
    /// Enable internal pull-up
    pub pull_up: bool,
}

impl PinConfig {
    /// Create a pin config without pull-up
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            pull_up: false,
        }
    }

    /// Create a pin config with pull-up enabled
    pub const fn with_pullup(pin: u8) -> Self {
        Self { pin, pull_up: true }
    }
}

/// `[i2c]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cBusConfig {
    /// Data line
    pub sda_pin: PinConfig,
    /// Clock line
    pub scl_pin: PinConfig,
    /// Bus clock in Hz
    pub speed_hz: u32,
}

impl Default for I2cBusConfig {
    fn default() -> Self {
        // XIAO RP2040: D4 = GPIO6 (SDA), D5 = GPIO7 (SCL) on I2C1
        Self {
            sda_pin: PinConfig::with_pullup(6),
            scl_pin: PinConfig::with_pullup(7),
            speed_hz: I2cConfig::STANDARD_HZ,
        }
    }
}

impl I2cBusConfig {
    /// Configuration handed to the HAL
    pub fn hal_config(&self) -> I2cConfig {
        I2cConfig {
            frequency: self.speed_hz,
            sda_pin: self.sda_pin.pin,
            scl_pin: self.scl_pin.pin,
            sda_pull_up: self.sda_pin.pull_up,
            scl_pull_up: self.scl_pin.pull_up,
        }
    }
}

/// `[console]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsoleConfig {
    /// Status LED half period
    pub led_blink_ms: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { led_blink_ms: 250 }
    }
}

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub i2c: I2cBusConfig,
    pub transport: TransportConfig,
    pub si5351: EngineConfig,
    pub console: ConsoleConfig,
}
