//! Si5351 clock generator support
//!
//! - [`registers`]: register addresses, channels, named-register lookup
//! - [`divider`]: integer multisynth encoding (P1/P2/P3)
//! - [`control`]: CLKx control and crystal load bit fields
//! - [`engine`]: write sequences for bring-up and channel changes

pub mod control;
pub mod divider;
pub mod engine;
pub mod registers;

pub use control::{ClockControl, CrystalLoad, DriveStrength};
pub use divider::{Encoded, IntegerDivider};
pub use engine::{
    BringUp, BusOp, ChannelOutcome, ChannelPlan, ChannelStatus, ClockGen, DeviceStatus, EngineConfig,
    EngineError, Identity,
};
pub use registers::{Channel, Pll, RegisterInfo};
