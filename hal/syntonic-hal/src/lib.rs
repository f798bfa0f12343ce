//! Syntonic Hardware Abstraction Layer
//!
//! This crate defines hardware abstraction traits that can be implemented
//! by chip-specific HALs (RP2040 today). The core crate drives an I2C bus
//! and its two pins only through these traits, which is what lets the same
//! transport, scanner and clock-generator code run against a simulated bus
//! on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (syntonic-firmware, cli)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  syntonic-core (transport, si5351)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  syntonic-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ syntonic-hal- │       │  core::sim    │
//! │    rp2040     │       │ (host tests)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cBus`] - Bounded-time I2C transactions
//! - [`i2c::I2cPeripheral`] - Enabling/disabling the I2C block and its pin functions
//! - [`gpio::RecoveryLines`] - The same two pins driven as plain GPIO
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O
//! - [`time::Timebase`] - Monotonic time plus async delays

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod time;

// Re-export key traits at crate root for convenience
pub use gpio::{InputPin, OutputPin, RecoveryLines};
pub use i2c::{I2cBus, I2cConfig, I2cError, I2cPeripheral};
pub use time::Timebase;
