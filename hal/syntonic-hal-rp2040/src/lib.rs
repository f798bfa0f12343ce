//! RP2040-specific HAL for the clock-generator firmware
//!
//! This crate provides RP2040-specific implementations of the shared
//! `syntonic-hal` traits:
//!
//! - I2C master with per-transfer time bounds and GPIO takeover of its pins
//! - GPIO lines for stuck-bus recovery
//! - Embassy-backed timebase

#![no_std]

pub mod gpio;
pub mod i2c;
pub mod time;

pub use gpio::GpioLine;
pub use i2c::Rp2040I2c;
pub use time::EmbassyTimebase;

// Re-export shared traits from syntonic-hal for convenience
pub use syntonic_hal::{I2cBus, I2cConfig, I2cError, I2cPeripheral, RecoveryLines, Timebase};
