//! Simulated I2C bus for host-side tests
//!
//! [`SimBus`] implements the HAL traits the core crate needs and models:
//!
//! - one register-bearing peer (a 256-byte register file with auto-increment)
//! - any number of extra addresses that only acknowledge
//! - scripted NACK/timeout faults, on the address phase or the read phase
//! - a peer holding SDA low until a given number of recovery clock pulses
//! - a log of every transfer that reached the wire
//!
//! [`SimTimebase`] is a virtual clock that only advances when delayed.

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use syntonic_hal::{
    I2cBus, I2cConfig, I2cError, I2cPeripheral, InputPin, OutputPin, RecoveryLines, Timebase,
};

use crate::bus::BusHandle;
use crate::si5351::registers::PLL_RESET;
use crate::transport::{Transport, TransportConfig, TransportError};

/// Transfers kept in the log
pub const LOG_CAPACITY: usize = 512;

/// One transfer as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// 7-bit address the transfer started with
    pub address: u8,
    /// Kind of transfer
    pub kind: TransferKind,
    /// Bound the caller asked for
    pub timeout_us: u32,
}

/// Shape of a logged transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Plain write of `len` bytes (0 = address-only probe)
    Write { len: usize },
    /// Register read; `read_issued` is false when the write phase failed
    WriteRead {
        write_len: usize,
        read_len: usize,
        read_issued: bool,
    },
}

/// Data line state during recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stuck {
    Free,
    Pulses(u8),
    Forever,
}

/// Both bus lines in GPIO mode
///
/// Serves as the clock output and the data input at once, so a clock edge
/// can release the data line.
#[derive(Debug)]
pub struct SimLines {
    clock_high: bool,
    rising_edges: u8,
    stuck: Stuck,
}

impl OutputPin for SimLines {
    fn set_high(&mut self) {
        if !self.clock_high {
            self.rising_edges = self.rising_edges.saturating_add(1);
        }
        self.clock_high = true;
        if let Stuck::Pulses(n) = self.stuck {
            if self.rising_edges >= n {
                self.stuck = Stuck::Free;
            }
        }
    }

    fn set_low(&mut self) {
        self.clock_high = false;
    }
}

impl InputPin for SimLines {
    fn is_high(&self) -> bool {
        self.stuck == Stuck::Free
    }
}

/// Simulated I2C peripheral with one register-file peer
pub struct SimBus {
    peer_address: Option<u8>,
    registers: [u8; 256],
    extra_present: Vec<u8, 16>,
    fail_next: Option<(u8, I2cError)>,
    fail_read_phase: Option<I2cError>,
    fail_enable: bool,
    enabled: bool,
    enable_count: u8,
    gpio_mode: bool,
    gpio_pull_ups: Option<(bool, bool)>,
    applied: Option<I2cConfig>,
    lines: SimLines,
    pll_resets: u8,
    log: Vec<Transfer, LOG_CAPACITY>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// Empty bus: no peer, nothing present
    pub fn new() -> Self {
        Self {
            peer_address: None,
            registers: [0; 256],
            extra_present: Vec::new(),
            fail_next: None,
            fail_read_phase: None,
            fail_enable: false,
            enabled: false,
            enable_count: 0,
            gpio_mode: false,
            gpio_pull_ups: None,
            applied: None,
            lines: SimLines {
                clock_high: true,
                rising_edges: 0,
                stuck: Stuck::Free,
            },
            pll_resets: 0,
            log: Vec::new(),
        }
    }

    /// Bus with a register-bearing peer at `address`
    pub fn with_peer(address: u8) -> Self {
        let mut bus = Self::new();
        bus.peer_address = Some(address);
        bus
    }

    /// Make another address acknowledge
    pub fn add_present(&mut self, address: u8) {
        let _ = self.extra_present.push(address);
    }

    /// Remove the register-bearing peer from the bus
    pub fn remove_peer(&mut self) {
        self.peer_address = None;
    }

    /// Fail the next `count` transfers with `error` on the address phase
    pub fn fail_next(&mut self, count: u8, error: I2cError) {
        self.fail_next = Some((count, error));
    }

    /// Fail the read phase of the next register read
    pub fn fail_next_read_phase(&mut self, error: I2cError) {
        self.fail_read_phase = Some(error);
    }

    /// Make `enable` reject the configuration
    pub fn fail_enable(&mut self, fail: bool) {
        self.fail_enable = fail;
    }

    /// Hold SDA low until `pulses` clock pulses have been seen
    pub fn hold_data_low(&mut self, pulses: u8) {
        self.lines.stuck = Stuck::Pulses(pulses);
    }

    /// Hold SDA low regardless of clocking
    pub fn hold_data_low_forever(&mut self) {
        self.lines.stuck = Stuck::Forever;
    }

    /// Preset a peer register
    pub fn set_register(&mut self, register: u8, value: u8) {
        self.registers[register as usize] = value;
    }

    /// Current value of a peer register
    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    /// `len` peer registers starting at `base`
    pub fn registers(&self, base: u8, len: usize) -> &[u8] {
        let start = base as usize;
        &self.registers[start..(start + len).min(256)]
    }

    /// Copy of the whole register file
    pub fn snapshot(&self) -> [u8; 256] {
        self.registers
    }

    /// Writes seen on the PLL reset register
    pub fn pll_resets(&self) -> u8 {
        self.pll_resets
    }

    /// Whether the I2C block is currently enabled
    pub fn peripheral_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of successful `enable` calls
    pub fn enable_count(&self) -> u8 {
        self.enable_count
    }

    /// Whether the pins are currently GPIO
    pub fn in_gpio_mode(&self) -> bool {
        self.gpio_mode
    }

    /// Configuration of the last successful `enable`
    pub fn applied_config(&self) -> Option<I2cConfig> {
        self.applied
    }

    /// Pull-ups (data, clock) of the current GPIO session
    pub fn gpio_pull_ups(&self) -> Option<(bool, bool)> {
        self.gpio_pull_ups
    }

    /// Clock rising edges during the current GPIO session
    pub fn recovery_pulses(&self) -> u8 {
        self.lines.rising_edges
    }

    /// Transfers that reached the wire
    pub fn log(&self) -> &[Transfer] {
        &self.log
    }

    /// Forget logged transfers
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    fn record(&mut self, transfer: Transfer) {
        let _ = self.log.push(transfer);
    }

    fn acknowledges(&self, address: u8) -> bool {
        self.peer_address == Some(address) || self.extra_present.contains(&address)
    }

    /// Outcome of the address phase
    fn address_phase(&mut self, address: u8) -> Result<(), I2cError> {
        if !self.enabled || self.gpio_mode {
            return Err(I2cError::Bus);
        }
        if self.lines.stuck != Stuck::Free {
            return Err(I2cError::Timeout);
        }
        if let Some((count, error)) = self.fail_next {
            self.fail_next = if count > 1 {
                Some((count - 1, error))
            } else {
                None
            };
            return Err(error);
        }
        if self.acknowledges(address) {
            Ok(())
        } else {
            Err(I2cError::Nack)
        }
    }

    fn store(&mut self, address: u8, data: &[u8]) {
        if self.peer_address != Some(address) {
            return;
        }
        if let Some((&register, payload)) = data.split_first() {
            for (offset, &byte) in payload.iter().enumerate() {
                let index = register.wrapping_add(offset as u8);
                self.registers[index as usize] = byte;
                if index == PLL_RESET {
                    self.pll_resets = self.pll_resets.saturating_add(1);
                }
            }
        }
    }
}

impl I2cBus for SimBus {
    async fn write(&mut self, address: u8, data: &[u8], timeout_us: u32) -> Result<(), I2cError> {
        self.record(Transfer {
            address,
            kind: TransferKind::Write { len: data.len() },
            timeout_us,
        });
        self.address_phase(address)?;
        self.store(address, data);
        Ok(())
    }

    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
        timeout_us: u32,
    ) -> Result<(), I2cError> {
        let write_phase = self.address_phase(address);
        let read_phase = match write_phase {
            Ok(()) => self.fail_read_phase.take().map_or(Ok(()), Err),
            Err(_) => Ok(()),
        };
        self.record(Transfer {
            address,
            kind: TransferKind::WriteRead {
                write_len: write_data.len(),
                read_len: read_buf.len(),
                read_issued: write_phase.is_ok(),
            },
            timeout_us,
        });
        write_phase?;
        read_phase?;

        let start = write_data.first().copied().unwrap_or(0);
        for (offset, slot) in read_buf.iter_mut().enumerate() {
            *slot = if self.peer_address == Some(address) {
                self.registers[start.wrapping_add(offset as u8) as usize]
            } else {
                0
            };
        }
        Ok(())
    }
}

impl I2cPeripheral for SimBus {
    fn enable(&mut self, config: &I2cConfig) -> Result<(), I2cError> {
        if self.fail_enable {
            return Err(I2cError::InvalidConfig);
        }
        self.applied = Some(*config);
        self.gpio_mode = false;
        self.enabled = true;
        self.enable_count = self.enable_count.saturating_add(1);
        Ok(())
    }

    fn disable(&mut self) {
        self.enabled = false;
    }
}

impl RecoveryLines for SimBus {
    type Clock = SimLines;
    type Data = SimLines;

    fn enter_gpio(&mut self, config: &I2cConfig) {
        self.gpio_mode = true;
        self.gpio_pull_ups = Some((config.sda_pull_up, config.scl_pull_up));
        self.lines.clock_high = true;
        self.lines.rising_edges = 0;
    }

    fn leave_gpio(&mut self) {
        self.gpio_mode = false;
        self.gpio_pull_ups = None;
    }

    fn clock(&mut self) -> &mut SimLines {
        &mut self.lines
    }

    fn data(&self) -> &SimLines {
        &self.lines
    }
}

/// Virtual clock advanced only by delays
#[derive(Debug, Default)]
pub struct SimTimebase {
    now_ns: u64,
    delays: u32,
}

impl SimTimebase {
    /// Clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed virtual time in microseconds
    pub fn now_us(&self) -> u64 {
        self.now_ns / 1_000
    }

    /// Number of delay calls made
    pub fn delay_calls(&self) -> u32 {
        self.delays
    }
}

impl DelayNs for SimTimebase {
    async fn delay_ns(&mut self, ns: u32) {
        self.now_ns += ns as u64;
        self.delays += 1;
    }

    async fn delay_us(&mut self, us: u32) {
        self.now_ns += us as u64 * 1_000;
        self.delays += 1;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.now_ns += ms as u64 * 1_000_000;
        self.delays += 1;
    }
}

impl Timebase for SimTimebase {
    fn now_ms(&self) -> u64 {
        self.now_ns / 1_000_000
    }
}

/// Initialized transport with default timing over `sim`
pub fn transport(sim: SimBus) -> Result<Transport<SimBus, SimTimebase>, TransportError> {
    let mut transport = Transport::new(
        BusHandle::new(sim, I2cConfig::default()),
        SimTimebase::new(),
        TransportConfig::default(),
    );
    transport.init()?;
    Ok(transport)
}
