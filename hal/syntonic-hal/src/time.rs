//! Time source abstraction
//!
//! The transport needs a monotonic clock for retry deadlines and delays for
//! settle times and recovery clock phases. Delays come from
//! `embedded-hal-async` so any executor-backed delay can be plugged in.

use embedded_hal_async::delay::DelayNs;

/// Monotonic millisecond clock with async delays
pub trait Timebase: DelayNs {
    /// Milliseconds since an arbitrary fixed origin (typically boot)
    fn now_ms(&self) -> u64;
}
