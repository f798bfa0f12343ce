//! Embassy async tasks
//!
//! Each task runs independently and communicates via signals.

pub mod console;
pub mod led;
pub mod usb;

pub use console::console_task;
pub use led::led_task;
pub use usb::usb_task;
