//! Text command console for the Syntonic firmware
//!
//! Host-independent pieces of the USB serial console:
//!
//! - [`line`]: byte stream to command lines
//! - [`command`]: command grammar
//! - [`console`]: dispatcher running commands against the transport and
//!   the Si5351 engine, plus the boot sequence
//!
//! Output goes to any `embedded_io_async::Write`, so the same console runs
//! over CDC-ACM on the board and into a buffer in tests.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod help;

pub mod command;
pub mod console;
pub mod line;

pub use command::{parse, Command, CommandError, ScanMode};
pub use console::{BootFailure, BootOutcome, Console};
pub use line::LineAssembler;
