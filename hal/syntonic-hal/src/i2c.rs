//! I2C bus abstractions
//!
//! Provides traits for I2C master operations that can be implemented
//! by chip-specific HALs. Every transfer carries its own time bound so a
//! peer that stretches the clock forever cannot hang the caller.

/// Error from I2C operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// Address or data byte not acknowledged
    Nack,
    /// Transfer did not complete within its bound
    Timeout,
    /// Bus error (misplaced START/STOP)
    Bus,
    /// Arbitration lost
    ArbitrationLost,
    /// Overrun
    Overrun,
    /// Peripheral rejected the requested configuration
    InvalidConfig,
    /// Other error
    Other,
}

/// I2C bus master
///
/// Provides bounded-time write and write-then-read transfers for
/// communicating with peripheral devices.
#[allow(async_fn_in_trait)]
pub trait I2cBus {
    /// Write data to a device at the given address, ending with STOP
    ///
    /// An empty `data` slice is an address-only transfer: the peer is
    /// addressed for writing and nothing else is sent. This is how presence
    /// is probed.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    /// * `timeout_us` - Upper bound for the whole transfer
    async fn write(&mut self, address: u8, data: &[u8], timeout_us: u32)
        -> Result<(), I2cError>;

    /// Write then read with a repeated START between the two phases
    ///
    /// This is the register-read primitive: write the register address
    /// without STOP, then read with STOP. Each phase is bounded by
    /// `timeout_us`. If the write phase fails the read phase must not be
    /// issued.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `write_data` - Bytes to write (typically register address)
    /// * `read_buf` - Buffer to read into
    /// * `timeout_us` - Upper bound for each phase
    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
        timeout_us: u32,
    ) -> Result<(), I2cError>;
}

/// Lifecycle of the I2C block and its pin functions
///
/// `enable` clocks the peripheral at the configured speed and routes both
/// pins to it with pull-ups. `disable` tears the peripheral down and leaves
/// the pins unrouted.
pub trait I2cPeripheral {
    /// Configure the peripheral and apply the I2C pin function
    fn enable(&mut self, config: &I2cConfig) -> Result<(), I2cError>;

    /// Deinitialize the peripheral
    fn disable(&mut self);
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// GPIO number of the data line
    pub sda_pin: u8,
    /// GPIO number of the clock line
    pub scl_pin: u8,
    /// Internal pull-up on the data line
    pub sda_pull_up: bool,
    /// Internal pull-up on the clock line
    pub scl_pull_up: bool,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 100kHz standard mode
            sda_pin: 6,
            scl_pin: 7,
            sda_pull_up: true,
            scl_pull_up: true,
        }
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD_HZ: u32 = 100_000;

    /// Fast mode (400 kHz)
    pub const FAST_HZ: u32 = 400_000;

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS_HZ: u32 = 1_000_000;

    /// Lowest clock the peripherals we target can be configured for
    pub const MIN_HZ: u32 = 10_000;

    /// Check that the speed is one a standard-mode/fast-mode peripheral accepts
    pub fn is_supported_speed(&self) -> bool {
        (Self::MIN_HZ..=Self::FAST_PLUS_HZ).contains(&self.frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standard_mode() {
        let config = I2cConfig::default();
        assert_eq!(config.frequency, I2cConfig::STANDARD_HZ);
        assert!(config.is_supported_speed());
    }

    #[test]
    fn test_speed_bounds() {
        let mut config = I2cConfig::default();
        config.frequency = 5_000;
        assert!(!config.is_supported_speed());
        config.frequency = I2cConfig::FAST_PLUS_HZ;
        assert!(config.is_supported_speed());
        config.frequency = 3_400_000;
        assert!(!config.is_supported_speed());
    }
}
