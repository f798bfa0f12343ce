//! GPIO lines used while the I2C block is off
//!
//! A [`GpioLine`] is empty while the I2C block owns the pin. Driving an
//! empty line does nothing and sampling it reads high (idle bus).

use embassy_rp::gpio::{Flex, Pull};
use syntonic_hal::{InputPin, OutputPin};

/// One bus line as plain GPIO
#[derive(Default)]
pub struct GpioLine {
    pin: Option<Flex<'static>>,
}

impl GpioLine {
    /// Clock line: push-pull output idling high
    pub fn output(mut pin: Flex<'static>, pull_up: bool) -> Self {
        pin.set_pull(pull(pull_up));
        pin.set_high();
        pin.set_as_output();
        Self { pin: Some(pin) }
    }

    /// Data line: input
    pub fn input(mut pin: Flex<'static>, pull_up: bool) -> Self {
        pin.set_pull(pull(pull_up));
        pin.set_as_input();
        Self { pin: Some(pin) }
    }

    /// Drop the GPIO configuration, disconnecting the pad
    pub fn release(&mut self) {
        self.pin = None;
    }
}

fn pull(up: bool) -> Pull {
    if up {
        Pull::Up
    } else {
        Pull::None
    }
}

impl OutputPin for GpioLine {
    fn set_high(&mut self) {
        if let Some(pin) = self.pin.as_mut() {
            pin.set_high();
        }
    }

    fn set_low(&mut self) {
        if let Some(pin) = self.pin.as_mut() {
            pin.set_low();
        }
    }
}

impl InputPin for GpioLine {
    fn is_high(&self) -> bool {
        self.pin.as_ref().map_or(true, |pin| pin.is_high())
    }
}
