//! Board-agnostic core logic for the Syntonic clock-generator firmware
//!
//! This crate contains all logic that does not depend on a specific chip:
//!
//! - Bus handle with peripheral/GPIO pin ownership
//! - Stuck-bus recovery by manual clocking
//! - Bounded-time I2C transport with retry windows
//! - Address scanner
//! - Si5351 register map, divider encoding and programming engine
//! - Board configuration types and parser
//!
//! Everything is generic over the traits in `syntonic-hal`, so the same code
//! runs on the RP2040 and against the simulated bus in host tests.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod bus;
pub mod config;
pub mod log;
pub mod recovery;
pub mod scanner;
pub mod si5351;
pub mod transport;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::{BusHandle, PinMode};
pub use recovery::{clear_bus, RecoveryReport};
pub use scanner::{
    scan_quick, scan_thorough, scan_verified, PeerAddress, ScanReport, VerifiedPeer, VerifiedReport,
};
pub use transport::{Transport, TransportConfig, TransportError};
