//! Multisynth parameter encoding
//!
//! Both the PLL feedback stage and the output stages are multisynth dividers
//! of the form `a + b/c`. The chip takes them as three packed fields:
//!
//! ```text
//! P1 = 128·a + floor(128·b/c) - 512
//! P2 = 128·b - c·floor(128·b/c)
//! P3 = c
//! ```
//!
//! Only integer dividers (b = 0, c = 1) are supported, which gives
//! P1 = 128·a - 512, P2 = 0, P3 = 1. Fractional dividers are not implemented.

use super::registers::PARAMS_LEN;

/// Smallest output multisynth divider
pub const MIN_OUTPUT_DIVIDER: u32 = 4;
/// Largest output multisynth divider
pub const MAX_OUTPUT_DIVIDER: u32 = 2048;
/// Smallest PLL feedback multiplier
pub const MIN_PLL_MULTIPLIER: u32 = 15;
/// Largest PLL feedback multiplier
pub const MAX_PLL_MULTIPLIER: u32 = 90;

/// An integer multisynth divider `a` (b = 0, c = 1)
///
/// Always within [`MIN_OUTPUT_DIVIDER`]..=[`MAX_OUTPUT_DIVIDER`], so the
/// packed fields fit their registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntegerDivider(u32);

/// PLL multiplier for a 25 MHz crystal and an 800 MHz PLL
pub const DEFAULT_PLL_MULTIPLIER: IntegerDivider = IntegerDivider(32);

impl IntegerDivider {
    /// Wrap `a` if it lies in the encodable range
    pub const fn new(a: u32) -> Option<Self> {
        if a >= MIN_OUTPUT_DIVIDER && a <= MAX_OUTPUT_DIVIDER {
            Some(Self(a))
        } else {
            None
        }
    }

    /// Divider whose output is closest to `target_hz`, clamped to the minimum
    ///
    /// Rounds half up: `round(source_hz / target_hz)`. `None` when the
    /// rounded divider is above [`MAX_OUTPUT_DIVIDER`].
    pub fn nearest(source_hz: u32, target_hz: u32) -> Option<Self> {
        let target = target_hz.max(1) as u64;
        let a = (source_hz as u64 + target / 2) / target;
        if a > MAX_OUTPUT_DIVIDER as u64 {
            return None;
        }
        Some(Self((a as u32).max(MIN_OUTPUT_DIVIDER)))
    }

    /// The divider value `a`
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Frequency produced from `source_hz`
    pub const fn output_hz(self, source_hz: u32) -> u32 {
        source_hz / self.0
    }

    /// Packed register fields
    pub const fn encode(self) -> Encoded {
        Encoded {
            p1: 128 * self.0 - 512,
            p2: 0,
            p3: 1,
        }
    }
}

/// Packed multisynth fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Encoded {
    /// 18-bit integer part
    pub p1: u32,
    /// 20-bit fractional numerator
    pub p2: u32,
    /// 20-bit fractional denominator
    pub p3: u32,
}

impl Encoded {
    /// Register block layout, starting at the block's base address
    ///
    /// Output multisynths share bits 7:2 of the third byte with R_DIV and
    /// DIVBY4; they are written as zero (R = 1, no divide-by-4).
    pub const fn to_bytes(&self) -> [u8; PARAMS_LEN] {
        [
            (self.p3 >> 8) as u8,
            self.p3 as u8,
            ((self.p1 >> 16) & 0x03) as u8,
            (self.p1 >> 8) as u8,
            self.p1 as u8,
            (((self.p3 >> 12) & 0xF0) | ((self.p2 >> 16) & 0x0F)) as u8,
            (self.p2 >> 8) as u8,
            self.p2 as u8,
        ]
    }

    /// Unpack a register block (inverse of [`Encoded::to_bytes`])
    pub const fn from_bytes(bytes: &[u8; PARAMS_LEN]) -> Self {
        let p1 = ((bytes[2] as u32 & 0x03) << 16) | ((bytes[3] as u32) << 8) | bytes[4] as u32;
        let p2 = ((bytes[5] as u32 & 0x0F) << 16) | ((bytes[6] as u32) << 8) | bytes[7] as u32;
        let p3 = ((bytes[5] as u32 & 0xF0) << 12) | ((bytes[0] as u32) << 8) | bytes[1] as u32;
        Self { p1, p2, p3 }
    }

    /// The integer divider these fields describe, if they describe one
    pub const fn integer_divider(&self) -> Option<IntegerDivider> {
        if self.p2 != 0 || self.p3 != 1 || (self.p1 + 512) % 128 != 0 {
            return None;
        }
        IntegerDivider::new((self.p1 + 512) / 128)
    }
}
