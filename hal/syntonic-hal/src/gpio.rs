//! GPIO pin abstractions
//!
//! Provides traits for digital input and output pins, and for taking the
//! two I2C lines away from the I2C block so they can be bit-banged during
//! stuck-bus recovery.

use crate::i2c::I2cConfig;

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Digital input pin
///
/// Implementations should handle the actual hardware register reading
/// for the specific chip.
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// The SDA/SCL pair owned as plain GPIO
///
/// This is the second capability set over the bus pins. While the lines
/// are in GPIO mode the I2C block must not be used; the core crate's bus
/// handle enforces that by only handing out one of the two at a time.
pub trait RecoveryLines {
    /// Clock line, driven as an output
    type Clock: OutputPin;
    /// Data line, sampled as an input
    type Data: InputPin;

    /// Reconfigure both pins as GPIO
    ///
    /// Clock becomes an output (idle high), data becomes an input. Each
    /// line gets the internal pull-up `config` asks for.
    fn enter_gpio(&mut self, config: &I2cConfig);

    /// Drop the GPIO configuration of both pins
    fn leave_gpio(&mut self);

    /// Access the clock line
    fn clock(&mut self) -> &mut Self::Clock;

    /// Access the data line
    fn data(&self) -> &Self::Data;
}
