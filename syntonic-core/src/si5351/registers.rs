//! Si5351 register map
//!
//! Addresses follow the Si5351A/B/C datasheet (AN619). Only the registers
//! the engine touches or that are useful for field debugging are named.

/// Device status: SYS_INIT, LOL_B, LOL_A, LOS, REVID
pub const DEVICE_STATUS: u8 = 0;
/// Sticky interrupt status flags
pub const INTERRUPT_STATUS: u8 = 1;
/// Output enable control, one disable bit per output
pub const OUTPUT_ENABLE: u8 = 3;
/// CLK0 control
pub const CLK0_CONTROL: u8 = 16;
/// CLK1 control
pub const CLK1_CONTROL: u8 = 17;
/// CLK2 control
pub const CLK2_CONTROL: u8 = 18;
/// PLL A feedback multisynth parameters (8 bytes)
pub const PLLA_PARAMS: u8 = 26;
/// PLL B feedback multisynth parameters (8 bytes)
pub const PLLB_PARAMS: u8 = 34;
/// Multisynth 0 parameters (8 bytes)
pub const MS0_PARAMS: u8 = 42;
/// Multisynth 1 parameters (8 bytes)
pub const MS1_PARAMS: u8 = 50;
/// Multisynth 2 parameters (8 bytes)
pub const MS2_PARAMS: u8 = 58;
/// PLL soft reset
pub const PLL_RESET: u8 = 177;
/// Crystal internal load capacitance
pub const CRYSTAL_LOAD: u8 = 183;

/// Length of a PLL or multisynth parameter block
pub const PARAMS_LEN: usize = 8;

/// PLL_RESET value that resets both PLLs
pub const PLL_RESET_BOTH: u8 = 0xA0;

/// DEVICE_STATUS bits
pub mod status {
    /// System initialization in progress
    pub const SYS_INIT: u8 = 1 << 7;
    /// PLL B loss of lock
    pub const LOL_B: u8 = 1 << 6;
    /// PLL A loss of lock
    pub const LOL_A: u8 = 1 << 5;
    /// Loss of CLKIN signal
    pub const LOS: u8 = 1 << 4;
    /// Revision ID field
    pub const REVID_MASK: u8 = 0x03;
}

/// One of the three outputs of the 3-output (10-MSOP) variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Clk0,
    Clk1,
    Clk2,
}

impl Channel {
    /// All channels in index order
    pub const ALL: [Channel; 3] = [Channel::Clk0, Channel::Clk1, Channel::Clk2];

    /// Channel from its index (0..=2)
    pub const fn new(index: u8) -> Option<Self> {
        match index {
            0 => Some(Channel::Clk0),
            1 => Some(Channel::Clk1),
            2 => Some(Channel::Clk2),
            _ => None,
        }
    }

    /// Index as printed (CLK0 = 0)
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Address of the CLKx control register
    pub const fn control_register(self) -> u8 {
        CLK0_CONTROL + self as u8
    }

    /// Base address of the multisynth parameter block
    pub const fn params_register(self) -> u8 {
        MS0_PARAMS + self as u8 * PARAMS_LEN as u8
    }

    /// This channel's disable bit in OUTPUT_ENABLE
    pub const fn oe_mask(self) -> u8 {
        1 << self as u8
    }
}

/// PLL selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pll {
    A,
    B,
}

impl Pll {
    /// Base address of the feedback multisynth parameter block
    pub const fn params_register(self) -> u8 {
        match self {
            Pll::A => PLLA_PARAMS,
            Pll::B => PLLB_PARAMS,
        }
    }
}

/// A named register or register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterInfo {
    /// Short name accepted by peek/poke
    pub name: &'static str,
    /// First address
    pub address: u8,
    /// Number of consecutive registers
    pub width: u8,
}

impl RegisterInfo {
    const fn new(name: &'static str, address: u8, width: u8) -> Self {
        Self {
            name,
            address,
            width,
        }
    }

    /// Whether `address` falls inside this register or block
    pub const fn contains(&self, address: u8) -> bool {
        address >= self.address && address - self.address < self.width
    }
}

/// Every named register, in address order
pub const MAP: [RegisterInfo; 13] = [
    RegisterInfo::new("status", DEVICE_STATUS, 1),
    RegisterInfo::new("int", INTERRUPT_STATUS, 1),
    RegisterInfo::new("oe", OUTPUT_ENABLE, 1),
    RegisterInfo::new("clk0", CLK0_CONTROL, 1),
    RegisterInfo::new("clk1", CLK1_CONTROL, 1),
    RegisterInfo::new("clk2", CLK2_CONTROL, 1),
    RegisterInfo::new("plla", PLLA_PARAMS, PARAMS_LEN as u8),
    RegisterInfo::new("pllb", PLLB_PARAMS, PARAMS_LEN as u8),
    RegisterInfo::new("ms0", MS0_PARAMS, PARAMS_LEN as u8),
    RegisterInfo::new("ms1", MS1_PARAMS, PARAMS_LEN as u8),
    RegisterInfo::new("ms2", MS2_PARAMS, PARAMS_LEN as u8),
    RegisterInfo::new("pllreset", PLL_RESET, 1),
    RegisterInfo::new("xtal", CRYSTAL_LOAD, 1),
];

/// Named register or block containing `address`
pub fn lookup(address: u8) -> Option<&'static RegisterInfo> {
    MAP.iter().find(|info| info.contains(address))
}

/// Register with the given name (case-insensitive)
pub fn by_name(name: &str) -> Option<&'static RegisterInfo> {
    MAP.iter().find(|info| info.name.eq_ignore_ascii_case(name))
}
