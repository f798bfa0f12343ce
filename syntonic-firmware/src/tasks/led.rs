//! Status LED task
//!
//! The LED stays off until the first interval arrives on [`LED_BLINK`],
//! then toggles at the most recently signalled interval.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Output;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

/// Blink interval used after a fatal boot failure
pub const FAULT_BLINK_MS: u32 = 50;

/// Blink interval in milliseconds
pub static LED_BLINK: Signal<CriticalSectionRawMutex, u32> = Signal::new();

/// LED task - toggles the LED at the signalled interval
#[embassy_executor::task]
pub async fn led_task(mut led: Output<'static>) {
    info!("LED task started");

    let mut interval = Duration::from_millis(LED_BLINK.wait().await as u64);
    loop {
        led.toggle();
        match select(Timer::after(interval), LED_BLINK.wait()).await {
            Either::First(()) => {}
            Either::Second(ms) => {
                debug!("LED interval {} ms", ms);
                interval = Duration::from_millis(ms as u64);
            }
        }
    }
}
