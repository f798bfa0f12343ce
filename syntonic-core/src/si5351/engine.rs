//! Si5351 register programming engine
//!
//! Turns channel/frequency requests into register write sequences. The
//! engine keeps no copy of the chip state: every read-modify-write reads the
//! register first, and `status`/`peek` are the only view of what the chip is
//! doing.
//!
//! Multi-register sequences are not transactional. A failure part way
//! through leaves the writes before it applied; the error names the register
//! that failed.

use syntonic_hal::{I2cBus, I2cPeripheral, RecoveryLines, Timebase};

use super::control::{ClockControl, CrystalLoad};
use super::divider::{
    Encoded, IntegerDivider, DEFAULT_PLL_MULTIPLIER, MAX_PLL_MULTIPLIER, MIN_PLL_MULTIPLIER,
};
use super::registers::{
    self, Channel, Pll, CRYSTAL_LOAD, DEVICE_STATUS, OUTPUT_ENABLE, PARAMS_LEN, PLL_RESET,
    PLL_RESET_BOTH,
};
use crate::log::{debug, info, warn};
use crate::transport::{Transport, TransportError};

/// Time given to the PLL to lock before outputs are programmed at bring-up
pub const PLL_LOCK_MS: u32 = 100;

/// Engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// `op` on `register` failed
    Bus {
        op: BusOp,
        register: u8,
        error: TransportError,
    },
    /// Requested or realized output above the supported maximum
    FrequencyTooHigh { requested_hz: u32, realized_hz: u32 },
    /// Requested output below what the largest divider reaches
    FrequencyTooLow { requested_hz: u32 },
    /// PLL frequency is not an integer multiple of the crystal in range
    UnsupportedPll { xtal_hz: u32, pll_hz: u32 },
}

/// Direction of a failed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusOp {
    Read,
    Write,
}

impl BusOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            BusOp::Read => "read",
            BusOp::Write => "write",
        }
    }
}

impl EngineError {
    fn read(register: u8) -> impl FnOnce(TransportError) -> EngineError {
        move |error| EngineError::Bus {
            op: BusOp::Read,
            register,
            error,
        }
    }

    fn write(register: u8) -> impl FnOnce(TransportError) -> EngineError {
        move |error| EngineError::Bus {
            op: BusOp::Write,
            register,
            error,
        }
    }
}

/// Static parameters of the attached chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// 7-bit I2C address
    pub address: u8,
    /// Reference crystal frequency
    pub xtal_hz: u32,
    /// PLL A frequency
    pub pll_hz: u32,
    /// Crystal load capacitance
    pub crystal_load: CrystalLoad,
    /// CLK0 frequency set by the full bring-up
    pub default_hz: u32,
    /// Highest output frequency accepted
    pub max_output_hz: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            address: 0x60,
            xtal_hz: 25_000_000,
            pll_hz: 800_000_000,
            crystal_load: CrystalLoad::Pf8,
            default_hz: 10_000_000,
            max_output_hz: 150_000_000,
        }
    }
}

/// Bring-up variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUp {
    /// Outputs off, crystal load, PLL A, PLL reset
    Basic,
    /// Basic, then CLK0 at the default frequency and CLK1/CLK2 powered down
    Full,
}

/// Divider chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelPlan {
    pub requested_hz: u32,
    pub realized_hz: u32,
    pub divider: IntegerDivider,
}

/// Result of a channel change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelOutcome {
    /// Output disabled; `output_enable` is the mask written back
    Disabled { output_enable: u8 },
    /// Output running at the planned divider
    Enabled(ChannelPlan),
}

/// Register 0 and 1 contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    pub reg0: u8,
    pub reg1: u8,
}

/// One output as read back from the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStatus {
    pub channel: Channel,
    pub control: ClockControl,
    /// Disable bit clear in OUTPUT_ENABLE
    pub output_enabled: bool,
    /// Integer divider, if the multisynth block holds one
    pub divider: Option<IntegerDivider>,
    /// Output frequency derived from PLL A and the divider
    pub output_hz: Option<u32>,
}

/// Snapshot of the chip state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    /// DEVICE_STATUS register
    pub device_status: u8,
    /// OUTPUT_ENABLE register
    pub output_enable: u8,
    pub channels: [ChannelStatus; 3],
}

impl DeviceStatus {
    /// Chip still initializing
    pub fn initializing(&self) -> bool {
        self.device_status & registers::status::SYS_INIT != 0
    }

    /// PLL A locked
    pub fn pll_a_locked(&self) -> bool {
        self.device_status & registers::status::LOL_A == 0
    }

    /// Silicon revision
    pub fn revision(&self) -> u8 {
        self.device_status & registers::status::REVID_MASK
    }
}

/// Programming engine for one Si5351 on a transport
pub struct ClockGen {
    config: EngineConfig,
    pll_multiplier: IntegerDivider,
}

impl Default for ClockGen {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            config,
            pll_multiplier: DEFAULT_PLL_MULTIPLIER,
        }
    }
}

impl ClockGen {
    /// Validate the PLL plan and create the engine
    ///
    /// PLL A must be an integer multiple (15..=90) of the crystal.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let unsupported = EngineError::UnsupportedPll {
            xtal_hz: config.xtal_hz,
            pll_hz: config.pll_hz,
        };
        if config.xtal_hz == 0 || config.pll_hz % config.xtal_hz != 0 {
            return Err(unsupported);
        }
        let multiplier = config.pll_hz / config.xtal_hz;
        if !(MIN_PLL_MULTIPLIER..=MAX_PLL_MULTIPLIER).contains(&multiplier) {
            return Err(unsupported);
        }
        let pll_multiplier = IntegerDivider::new(multiplier).ok_or(unsupported)?;
        Ok(Self {
            config,
            pll_multiplier,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Peer address
    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Choose the divider for `requested_hz` without touching the chip
    pub fn plan(&self, requested_hz: u32) -> Result<ChannelPlan, EngineError> {
        let divider = IntegerDivider::nearest(self.config.pll_hz, requested_hz)
            .ok_or(EngineError::FrequencyTooLow { requested_hz })?;
        let realized_hz = divider.output_hz(self.config.pll_hz);

        if requested_hz > self.config.max_output_hz || realized_hz > self.config.max_output_hz {
            return Err(EngineError::FrequencyTooHigh {
                requested_hz,
                realized_hz,
            });
        }

        Ok(ChannelPlan {
            requested_hz,
            realized_hz,
            divider,
        })
    }

    /// Bring the chip to a known state
    ///
    /// Repeating the call converges to the same register contents.
    pub async fn initialize_device<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        bring_up: BringUp,
    ) -> Result<(), EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        self.write(transport, OUTPUT_ENABLE, &[0xFF]).await?;
        self.write(transport, CRYSTAL_LOAD, &[self.config.crystal_load.bits()])
            .await?;

        let block = self.pll_multiplier.encode().to_bytes();
        self.write(transport, Pll::A.params_register(), &block).await?;
        self.write(transport, PLL_RESET, &[PLL_RESET_BOTH]).await?;
        info!(
            "Si5351 initialized (PLLA={} MHz, load={} pF)",
            self.config.pll_hz / 1_000_000,
            self.config.crystal_load.pf()
        );

        if bring_up == BringUp::Full {
            transport.delay_ms(PLL_LOCK_MS).await;
            self.set_channel(transport, Channel::Clk0, self.config.default_hz)
                .await?;
            self.power_down_channel(transport, Channel::Clk1).await?;
            self.power_down_channel(transport, Channel::Clk2).await?;
        }
        Ok(())
    }

    /// Run `channel` at `hz`, or disable it when `hz` is 0
    ///
    /// A rejected frequency leaves the chip untouched.
    pub async fn set_channel<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        channel: Channel,
        hz: u32,
    ) -> Result<ChannelOutcome, EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        if hz == 0 {
            let output_enable = self.disable_channel(transport, channel).await?;
            return Ok(ChannelOutcome::Disabled { output_enable });
        }

        let plan = self.plan(hz).inspect_err(|_| {
            warn!("CLK{} request {} Hz rejected", channel.index(), hz);
        })?;

        let block = plan.divider.encode().to_bytes();
        self.write(transport, channel.params_register(), &block).await?;
        self.write(
            transport,
            channel.control_register(),
            &[ClockControl::enabled().bits()],
        )
        .await?;

        let mask = self.read_output_enable(transport).await?;
        self.write(transport, OUTPUT_ENABLE, &[mask & !channel.oe_mask()])
            .await?;

        info!(
            "CLK{} = {} Hz (div={})",
            channel.index(),
            plan.realized_hz,
            plan.divider.get()
        );
        Ok(ChannelOutcome::Enabled(plan))
    }

    /// Set `channel`'s disable bit, leaving the other bits as read
    ///
    /// Returns the mask written.
    pub async fn disable_channel<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        channel: Channel,
    ) -> Result<u8, EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        let mask = self.read_output_enable(transport).await? | channel.oe_mask();
        self.write(transport, OUTPUT_ENABLE, &[mask]).await?;
        debug!("CLK{} disabled", channel.index());
        Ok(mask)
    }

    /// Disable `channel` and power down its output driver
    pub async fn power_down_channel<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        channel: Channel,
    ) -> Result<(), EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        self.disable_channel(transport, channel).await?;
        self.write(
            transport,
            channel.control_register(),
            &[ClockControl::powered_down().bits()],
        )
        .await
    }

    /// Enable (0x00) or disable (0xFF) every output at once
    pub async fn set_all_outputs<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        on: bool,
    ) -> Result<(), EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        let mask = if on { 0x00 } else { 0xFF };
        self.write(transport, OUTPUT_ENABLE, &[mask]).await
    }

    /// Read one register, single attempt
    pub async fn peek<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        register: u8,
    ) -> Result<u8, EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        let mut buf = [0u8; 1];
        transport
            .read(self.config.address, register, &mut buf)
            .await
            .map_err(EngineError::read(register))?;
        Ok(buf[0])
    }

    /// Write one register, single attempt
    pub async fn poke<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        register: u8,
        value: u8,
    ) -> Result<(), EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        transport
            .write(self.config.address, register, &[value])
            .await
            .map_err(EngineError::write(register))
    }

    /// Read registers 0 and 1
    pub async fn whoami<P, T>(&self, transport: &mut Transport<P, T>) -> Result<Identity, EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        let mut buf = [0u8; 2];
        transport
            .read(self.config.address, DEVICE_STATUS, &mut buf)
            .await
            .map_err(EngineError::read(DEVICE_STATUS))?;
        Ok(Identity {
            reg0: buf[0],
            reg1: buf[1],
        })
    }

    /// Read back status, output enables and every channel's configuration
    pub async fn status<P, T>(
        &self,
        transport: &mut Transport<P, T>,
    ) -> Result<DeviceStatus, EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        let device_status = self.peek(transport, DEVICE_STATUS).await?;
        let output_enable = self.peek(transport, OUTPUT_ENABLE).await?;

        let mut channels = [Channel::Clk0, Channel::Clk1, Channel::Clk2].map(|channel| {
            ChannelStatus {
                channel,
                control: ClockControl::powered_down(),
                output_enabled: output_enable & channel.oe_mask() == 0,
                divider: None,
                output_hz: None,
            }
        });

        for status in channels.iter_mut() {
            let channel = status.channel;
            status.control = ClockControl::from_bits(
                self.peek(transport, channel.control_register()).await?,
            );

            let mut block = [0u8; PARAMS_LEN];
            let base = channel.params_register();
            transport
                .read(self.config.address, base, &mut block)
                .await
                .map_err(EngineError::read(base))?;
            status.divider = Encoded::from_bytes(&block).integer_divider();
            status.output_hz = match (status.divider, status.control.pll()) {
                (Some(divider), Pll::A) => Some(divider.output_hz(self.config.pll_hz)),
                _ => None,
            };
        }

        Ok(DeviceStatus {
            device_status,
            output_enable,
            channels,
        })
    }

    /// Whether the chip acknowledges its address
    pub async fn ping<P, T>(&self, transport: &mut Transport<P, T>) -> bool
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        transport.probe(self.config.address).await
    }

    async fn read_output_enable<P, T>(
        &self,
        transport: &mut Transport<P, T>,
    ) -> Result<u8, EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        let window = transport.config().retry_window_ms;
        let mut buf = [0u8; 1];
        transport
            .read_with_timeout(self.config.address, OUTPUT_ENABLE, &mut buf, window)
            .await
            .map_err(EngineError::read(OUTPUT_ENABLE))?;
        Ok(buf[0])
    }

    async fn write<P, T>(
        &self,
        transport: &mut Transport<P, T>,
        register: u8,
        data: &[u8],
    ) -> Result<(), EngineError>
    where
        P: I2cBus + I2cPeripheral + RecoveryLines,
        T: Timebase,
    {
        let window = transport.config().retry_window_ms;
        transport
            .write_with_timeout(self.config.address, register, data, window)
            .await
            .map_err(EngineError::write(register))
    }
}
