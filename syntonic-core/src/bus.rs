//! Bus handle and pin-mode ownership
//!
//! One physical I2C bus is represented by exactly one [`BusHandle`]. The two
//! bus pins can be owned either by the I2C block (peripheral mode) or by
//! plain GPIO (recovery mode), never both. The handle tracks which, and only
//! hands out the capability that matches the current mode.

use syntonic_hal::{
    I2cBus, I2cConfig, I2cError, I2cPeripheral, InputPin, OutputPin, RecoveryLines,
};

use crate::log::{debug, warn};

/// Who currently drives the bus pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Neither configured (before init, after deinit)
    Released,
    /// Pins routed to the I2C block; transactions allowed
    Peripheral,
    /// Pins driven as GPIO; only recovery allowed
    Gpio,
}

/// Exclusive owner of one I2C peripheral instance and its two pins
pub struct BusHandle<P> {
    periph: P,
    config: I2cConfig,
    mode: PinMode,
}

impl<P> BusHandle<P>
where
    P: I2cBus + I2cPeripheral + RecoveryLines,
{
    /// Wrap a peripheral; nothing is configured until [`BusHandle::init`]
    pub fn new(periph: P, config: I2cConfig) -> Self {
        Self {
            periph,
            config,
            mode: PinMode::Released,
        }
    }

    /// Current pin ownership
    pub fn mode(&self) -> PinMode {
        self.mode
    }

    /// Bus configuration (speed and pin numbers)
    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    /// Route the pins to the I2C block and clock it at the configured speed
    ///
    /// Leaves GPIO mode first if the pins were in use for recovery.
    pub fn init(&mut self) -> Result<(), I2cError> {
        if !self.config.is_supported_speed() {
            warn!("I2C speed {} Hz rejected", self.config.frequency);
            return Err(I2cError::InvalidConfig);
        }

        match self.mode {
            PinMode::Gpio => self.periph.leave_gpio(),
            PinMode::Peripheral => self.periph.disable(),
            PinMode::Released => {}
        }
        self.mode = PinMode::Released;

        self.periph.enable(&self.config)?;
        self.mode = PinMode::Peripheral;
        debug!(
            "I2C initialized: SDA=GPIO{}, SCL=GPIO{}, speed={} Hz",
            self.config.sda_pin, self.config.scl_pin, self.config.frequency
        );
        Ok(())
    }

    /// Tear down whatever currently owns the pins
    pub fn deinit(&mut self) {
        match self.mode {
            PinMode::Peripheral => self.periph.disable(),
            PinMode::Gpio => self.periph.leave_gpio(),
            PinMode::Released => {}
        }
        self.mode = PinMode::Released;
    }

    /// Peripheral-mode capability, if the pins are routed to the I2C block
    pub fn bus(&mut self) -> Option<&mut impl I2cBus> {
        match self.mode {
            PinMode::Peripheral => Some(&mut self.periph),
            _ => None,
        }
    }

    /// Switch the pins to GPIO mode and return the recovery capability
    ///
    /// The I2C block is disabled first. The pins stay in GPIO mode until the
    /// next [`BusHandle::init`] or [`BusHandle::deinit`].
    pub fn gpio(&mut self) -> GpioLines<'_, P> {
        match self.mode {
            PinMode::Gpio => {}
            PinMode::Peripheral => {
                self.periph.disable();
                self.periph.enter_gpio(&self.config);
            }
            PinMode::Released => self.periph.enter_gpio(&self.config),
        }
        self.mode = PinMode::Gpio;
        GpioLines {
            lines: &mut self.periph,
        }
    }

    /// Access the wrapped peripheral regardless of mode
    ///
    /// Intended for tests and diagnostics that inspect the underlying
    /// implementation.
    pub fn inner(&self) -> &P {
        &self.periph
    }

    /// Mutable access to the wrapped peripheral regardless of mode
    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.periph
    }
}

/// GPIO-mode capability: the clock output and data input, nothing else
pub struct GpioLines<'a, P> {
    lines: &'a mut P,
}

impl<P: RecoveryLines> GpioLines<'_, P> {
    /// Drive the clock line
    pub fn set_clock(&mut self, high: bool) {
        self.lines.clock().set_state(high);
    }

    /// Sample the data line
    pub fn data_is_high(&self) -> bool {
        self.lines.data().is_high()
    }
}
