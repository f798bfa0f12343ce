//! Line assembly from a serial byte stream
//!
//! Bytes arrive one USB packet at a time with no framing. Printable ASCII
//! accumulates into the current line; CR or LF ends it. A CRLF pair ends the
//! line once, since the empty line after it is dropped.

use heapless::String;

/// Longest command line, terminator excluded
pub const LINE_LEN: usize = 63;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// Accumulates bytes into complete lines
#[derive(Debug, Clone, Default)]
pub struct LineAssembler {
    buffer: String<LINE_LEN>,
}

impl LineAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Partial line received so far
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Feed a single byte
    ///
    /// Returns the completed line when `byte` terminates a non-empty line.
    /// Bytes past [`LINE_LEN`] are dropped; non-printable bytes other than
    /// backspace/delete are ignored.
    pub fn feed(&mut self, byte: u8) -> Option<String<LINE_LEN>> {
        match byte {
            b'\r' | b'\n' => {
                if self.buffer.is_empty() {
                    None
                } else {
                    Some(core::mem::take(&mut self.buffer))
                }
            }
            BACKSPACE | DELETE => {
                self.buffer.pop();
                None
            }
            0x20..=0x7E => {
                // Overflow bytes are dropped
                let _ = self.buffer.push(byte as char);
                None
            }
            _ => None,
        }
    }
}
