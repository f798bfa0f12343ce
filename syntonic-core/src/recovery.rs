//! Stuck-bus recovery
//!
//! A peer that lost track of a transfer (reset mid-byte, glitch on SCL) can
//! hold SDA low forever, waiting for clocks that the I2C block will never
//! send because it sees the bus as busy. Clocking SCL by hand lets the peer
//! shift out whatever it thinks it is sending until it releases SDA.
//!
//! This is best effort: a peer still holding SDA after [`MAX_PULSES`] clocks
//! needs a power cycle.

use embedded_hal_async::delay::DelayNs;
use syntonic_hal::{I2cBus, I2cPeripheral, RecoveryLines};

use crate::bus::BusHandle;
use crate::log::{debug, warn};

/// Upper bound on recovery clocks (one byte plus the ACK slot)
pub const MAX_PULSES: u8 = 9;

/// Time each clock phase is held, in microseconds
pub const HALF_PERIOD_US: u32 = 5;

/// Time the lines get to settle after switching to GPIO, in microseconds
pub const SETTLE_US: u32 = 1_000;

/// Outcome of a recovery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoveryReport {
    /// Clock pulses issued
    pub pulses: u8,
    /// Whether SDA read high when recovery stopped
    pub released: bool,
}

/// Clock SCL by hand until the peer releases SDA
///
/// Switches the pins to GPIO (SCL output idling high, SDA input, pull-ups on
/// both) and issues up to [`MAX_PULSES`] pulses, sampling SDA after each one
/// and stopping at the first pulse after which it reads high.
///
/// The pins are left in GPIO mode. Call [`BusHandle::init`] (or
/// `Transport::init`) before issuing transactions again.
pub async fn clear_bus<P, D>(handle: &mut BusHandle<P>, delay: &mut D) -> RecoveryReport
where
    P: I2cBus + I2cPeripheral + RecoveryLines,
    D: DelayNs,
{
    let mut lines = handle.gpio();
    lines.set_clock(true);
    delay.delay_us(SETTLE_US).await;

    let mut pulses = 0;
    let mut released = false;
    while pulses < MAX_PULSES {
        lines.set_clock(false);
        delay.delay_us(HALF_PERIOD_US).await;
        lines.set_clock(true);
        delay.delay_us(HALF_PERIOD_US).await;
        pulses += 1;

        if lines.data_is_high() {
            released = true;
            break;
        }
    }
    delay.delay_us(HALF_PERIOD_US).await;

    if released {
        debug!("Bus clear: SDA released after {} pulses", pulses);
    } else {
        warn!("Bus clear: SDA still low after {} pulses", pulses);
    }

    RecoveryReport { pulses, released }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::PinMode;
    use crate::sim::{SimBus, SimTimebase};
    use embassy_futures::block_on;
    use syntonic_hal::I2cConfig;

    fn run(sim: SimBus) -> (RecoveryReport, BusHandle<SimBus>) {
        let mut handle = BusHandle::new(sim, I2cConfig::default());
        handle.init().unwrap();
        let mut time = SimTimebase::new();
        let report = block_on(clear_bus(&mut handle, &mut time));
        (report, handle)
    }

    #[test]
    fn test_free_bus_single_pulse() {
        let (report, handle) = run(SimBus::new());
        assert_eq!(
            report,
            RecoveryReport {
                pulses: 1,
                released: true
            }
        );
        assert_eq!(handle.mode(), PinMode::Gpio);
    }

    #[test]
    fn test_stops_at_first_release() {
        for stuck_for in 1..MAX_PULSES {
            let mut sim = SimBus::new();
            sim.hold_data_low(stuck_for);
            let (report, handle) = run(sim);
            assert_eq!(report.pulses, stuck_for);
            assert!(report.released);
            assert_eq!(handle.inner().recovery_pulses(), stuck_for);
        }
    }

    #[test]
    fn test_gives_up_after_nine_pulses() {
        let mut sim = SimBus::new();
        sim.hold_data_low_forever();
        let (report, handle) = run(sim);
        assert_eq!(report.pulses, MAX_PULSES);
        assert!(!report.released);
        assert_eq!(handle.inner().recovery_pulses(), MAX_PULSES);
    }

    #[test]
    fn test_leaves_pins_in_gpio_mode() {
        let mut sim = SimBus::new();
        sim.hold_data_low(3);
        let (_, mut handle) = run(sim);
        assert!(handle.inner().in_gpio_mode());
        assert!(!handle.inner().peripheral_enabled());
        assert!(handle.bus().is_none());
    }

    #[test]
    fn test_pulse_timing() {
        let mut handle = BusHandle::new(SimBus::new(), I2cConfig::default());
        let mut sim = SimBus::new();
        sim.hold_data_low(4);
        *handle.inner_mut() = sim;
        let mut time = SimTimebase::new();
        block_on(clear_bus(&mut handle, &mut time));
        // settle + 4 pulses of two phases + trailing hold
        let expected = SETTLE_US + 4 * 2 * HALF_PERIOD_US + HALF_PERIOD_US;
        assert_eq!(time.now_us(), expected as u64);
    }
}
