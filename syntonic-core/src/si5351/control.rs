//! Bit-field builders for CLKx control and crystal load

use super::registers::Pll;

/// Output drive strength
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveStrength {
    Ma2 = 0,
    Ma4 = 1,
    Ma6 = 2,
    Ma8 = 3,
}

/// CLKx control register value
///
/// ```text
/// bit 7    CLK_PDN   power down
/// bit 6    MS_INT    integer mode
/// bit 5    MS_SRC    0 = PLL A, 1 = PLL B
/// bit 4    CLK_INV   invert output
/// bits 3:2 CLK_SRC   3 = own multisynth
/// bits 1:0 IDRV      drive strength
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockControl(u8);

impl ClockControl {
    const POWER_DOWN: u8 = 1 << 7;
    const INTEGER_MODE: u8 = 1 << 6;
    const PLL_B: u8 = 1 << 5;
    const INVERT: u8 = 1 << 4;
    const SOURCE_MULTISYNTH: u8 = 0b11 << 2;
    const DRIVE_MASK: u8 = 0b11;

    /// Powered, integer mode, PLL A, own multisynth, 8 mA (0x4F)
    pub const fn enabled() -> Self {
        Self(Self::INTEGER_MODE | Self::SOURCE_MULTISYNTH | DriveStrength::Ma8 as u8)
    }

    /// Powered down, everything else cleared (0x80)
    pub const fn powered_down() -> Self {
        Self(Self::POWER_DOWN)
    }

    /// Wrap a raw register value
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw register value
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Select the PLL feeding this output's multisynth
    pub const fn with_pll(self, pll: Pll) -> Self {
        match pll {
            Pll::A => Self(self.0 & !Self::PLL_B),
            Pll::B => Self(self.0 | Self::PLL_B),
        }
    }

    /// Set the drive strength
    pub const fn with_drive(self, drive: DriveStrength) -> Self {
        Self((self.0 & !Self::DRIVE_MASK) | drive as u8)
    }

    /// Invert the output
    pub const fn with_inverted(self, inverted: bool) -> Self {
        if inverted {
            Self(self.0 | Self::INVERT)
        } else {
            Self(self.0 & !Self::INVERT)
        }
    }

    pub const fn is_powered_down(self) -> bool {
        self.0 & Self::POWER_DOWN != 0
    }

    pub const fn is_integer_mode(self) -> bool {
        self.0 & Self::INTEGER_MODE != 0
    }

    pub const fn pll(self) -> Pll {
        if self.0 & Self::PLL_B != 0 {
            Pll::B
        } else {
            Pll::A
        }
    }

    pub const fn drive(self) -> DriveStrength {
        match self.0 & Self::DRIVE_MASK {
            0 => DriveStrength::Ma2,
            1 => DriveStrength::Ma4,
            2 => DriveStrength::Ma6,
            _ => DriveStrength::Ma8,
        }
    }
}

/// Internal crystal load capacitance
///
/// Bits 7:6 of register 183 select the load; bits 5:0 are reserved and must
/// be written as 0b010010.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrystalLoad {
    Pf6,
    #[default]
    Pf8,
    Pf10,
}

impl CrystalLoad {
    const RESERVED: u8 = 0b01_0010;

    /// Load for a capacitance in picofarads
    pub const fn from_pf(pf: u8) -> Option<Self> {
        match pf {
            6 => Some(CrystalLoad::Pf6),
            8 => Some(CrystalLoad::Pf8),
            10 => Some(CrystalLoad::Pf10),
            _ => None,
        }
    }

    pub const fn pf(self) -> u8 {
        match self {
            CrystalLoad::Pf6 => 6,
            CrystalLoad::Pf8 => 8,
            CrystalLoad::Pf10 => 10,
        }
    }

    /// Register 183 value
    pub const fn bits(self) -> u8 {
        let select = match self {
            CrystalLoad::Pf6 => 0b01,
            CrystalLoad::Pf8 => 0b10,
            CrystalLoad::Pf10 => 0b11,
        };
        (select << 6) | Self::RESERVED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_control_byte() {
        let control = ClockControl::enabled();
        assert_eq!(control.bits(), 0x4F);
        assert!(!control.is_powered_down());
        assert!(control.is_integer_mode());
        assert_eq!(control.pll(), Pll::A);
        assert_eq!(control.drive(), DriveStrength::Ma8);
    }

    #[test]
    fn test_control_builders() {
        let control = ClockControl::enabled()
            .with_pll(Pll::B)
            .with_drive(DriveStrength::Ma2)
            .with_inverted(true);
        assert_eq!(control.bits(), 0x7C);
        assert_eq!(control.pll(), Pll::B);
        assert_eq!(control.with_pll(Pll::A).with_inverted(false).bits(), 0x4C);
        assert!(ClockControl::powered_down().is_powered_down());
        assert_eq!(ClockControl::powered_down().bits(), 0x80);
    }

    #[test]
    fn test_crystal_load_encoding() {
        assert_eq!(CrystalLoad::Pf6.bits(), 0x52);
        assert_eq!(CrystalLoad::Pf8.bits(), 0x92);
        assert_eq!(CrystalLoad::Pf10.bits(), 0xD2);
        assert_eq!(CrystalLoad::from_pf(8), Some(CrystalLoad::Pf8));
        assert_eq!(CrystalLoad::from_pf(7), None);
        assert_eq!(CrystalLoad::default().pf(), 8);
    }
}
