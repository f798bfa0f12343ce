//! Embassy-backed timebase

use embassy_time::{Delay, Instant};
use embedded_hal_async::delay::DelayNs;
use syntonic_hal::Timebase;

/// Monotonic clock and delays from the embassy time driver
pub struct EmbassyTimebase {
    delay: Delay,
}

impl EmbassyTimebase {
    pub fn new() -> Self {
        Self { delay: Delay }
    }
}

impl Default for EmbassyTimebase {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayNs for EmbassyTimebase {
    async fn delay_ns(&mut self, ns: u32) {
        DelayNs::delay_ns(&mut self.delay, ns).await
    }

    async fn delay_us(&mut self, us: u32) {
        DelayNs::delay_us(&mut self.delay, us).await
    }

    async fn delay_ms(&mut self, ms: u32) {
        DelayNs::delay_ms(&mut self.delay, ms).await
    }
}

impl Timebase for EmbassyTimebase {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
