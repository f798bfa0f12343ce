//! Board configuration
//!
//! Types describing the board, and a parser for the TOML file embedded in
//! the firmware image.

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, parse_pin, ParseError};
pub use types::*;
