//! I2C transaction layer
//!
//! Every operation here goes out as one or two bounded-time transfers on the
//! bus handle. Two families exist:
//!
//! - single attempts (`read`, `write`, `probe`), bounded by the per-transfer
//!   timeout; the scanner uses these
//! - retrying variants (`read_with_timeout`, `write_with_timeout`) that repeat
//!   the single attempt every retry interval until it succeeds or the window
//!   closes; configuration writes use these
//!
//! Wire format is byte-addressed registers: one register address byte, then
//! data. Reads use a repeated START between the two phases.

use heapless::Vec;
use syntonic_hal::{I2cBus, I2cError, I2cPeripheral, RecoveryLines, Timebase};

use crate::bus::{BusHandle, PinMode};
use crate::log::{debug, trace, warn};
use crate::recovery::{clear_bus, RecoveryReport};

/// Largest payload a single register write can carry
pub const MAX_PAYLOAD: usize = 8;

/// Staging buffer: register address plus payload
const STAGING_LEN: usize = MAX_PAYLOAD + 1;

/// Transaction outcome other than success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Peer did not acknowledge, or the bus reported an error
    NoAck,
    /// Transfer or retry window ran out
    Timeout,
    /// Payload does not fit the staging buffer; nothing was sent
    PayloadTooLarge { len: usize },
    /// Pins are not routed to the I2C block
    NotConfigured,
    /// Peripheral rejected the bus configuration
    Config(I2cError),
}

impl From<I2cError> for TransportError {
    fn from(e: I2cError) -> Self {
        match e {
            I2cError::Timeout => TransportError::Timeout,
            _ => TransportError::NoAck,
        }
    }
}

impl TransportError {
    /// Whether repeating the same transfer could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::NoAck | TransportError::Timeout)
    }
}

/// Timing parameters of the transaction layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportConfig {
    /// Bound on each transfer phase
    pub op_timeout_us: u32,
    /// Bound on a presence probe
    pub probe_timeout_us: u32,
    /// Default retry window of the retrying operations
    pub retry_window_ms: u32,
    /// Pause between retries
    pub retry_interval_ms: u32,
    /// Settle time between deinit and init on reset
    pub reset_settle_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            op_timeout_us: 2_000,
            probe_timeout_us: 1_000,
            retry_window_ms: 20,
            retry_interval_ms: 2,
            reset_settle_ms: 50,
        }
    }
}

/// Bounded-time I2C master on one bus
pub struct Transport<P, T> {
    handle: BusHandle<P>,
    time: T,
    config: TransportConfig,
}

impl<P, T> Transport<P, T>
where
    P: I2cBus + I2cPeripheral + RecoveryLines,
    T: Timebase,
{
    /// Create a transport; the bus is not configured until [`Transport::init`]
    pub fn new(handle: BusHandle<P>, time: T, config: TransportConfig) -> Self {
        Self {
            handle,
            time,
            config,
        }
    }

    /// Timing parameters
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Current pin ownership
    pub fn mode(&self) -> PinMode {
        self.handle.mode()
    }

    /// Underlying bus handle
    pub fn handle(&self) -> &BusHandle<P> {
        &self.handle
    }

    /// Underlying peripheral
    pub fn peripheral(&self) -> &P {
        self.handle.inner()
    }

    /// Mutable access to the underlying peripheral
    pub fn peripheral_mut(&mut self) -> &mut P {
        self.handle.inner_mut()
    }

    /// Time source
    pub fn time(&self) -> &T {
        &self.time
    }

    /// Wait on the transport's time source
    pub async fn delay_ms(&mut self, ms: u32) {
        self.time.delay_ms(ms).await;
    }

    /// Configure the peripheral and pin functions
    ///
    /// This is the only place a configuration failure is reported.
    pub fn init(&mut self) -> Result<(), TransportError> {
        self.handle.init().map_err(TransportError::Config)
    }

    /// Release the peripheral and pins
    pub fn deinit(&mut self) {
        self.handle.deinit();
    }

    /// Deinit, wait for the lines to settle, init again
    pub async fn reset(&mut self) -> Result<(), TransportError> {
        debug!("I2C reset");
        self.handle.deinit();
        self.time.delay_ms(self.config.reset_settle_ms).await;
        self.init()
    }

    /// Clock the bus free by hand, leaving the pins in GPIO mode
    pub async fn clear_bus(&mut self) -> RecoveryReport {
        clear_bus(&mut self.handle, &mut self.time).await
    }

    /// Clock the bus free by hand, then hand the pins back to the peripheral
    pub async fn recover(&mut self) -> Result<RecoveryReport, TransportError> {
        let report = self.clear_bus().await;
        self.init()?;
        Ok(report)
    }

    /// Read `buf.len()` bytes starting at `register`, single attempt
    ///
    /// The register address goes out without STOP, then the data is read
    /// with STOP. A failed address phase fails the whole call and no read
    /// is issued.
    pub async fn read(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), TransportError> {
        let timeout_us = self.config.op_timeout_us;
        let bus = self.handle.bus().ok_or(TransportError::NotConfigured)?;
        bus.write_read(address, &[register], buf, timeout_us)
            .await
            .map_err(|e| {
                trace!("I2C read {=u8:#04x}/{=u8:#04x} failed: {}", address, register, e);
                TransportError::from(e)
            })
    }

    /// Write `data` starting at `register`, single attempt
    ///
    /// Register address and payload go out in one transfer. Payloads longer
    /// than [`MAX_PAYLOAD`] are rejected before touching the bus.
    pub async fn write(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let staging = stage(register, data)?;
        let timeout_us = self.config.op_timeout_us;
        let bus = self.handle.bus().ok_or(TransportError::NotConfigured)?;
        bus.write(address, &staging, timeout_us).await.map_err(|e| {
            trace!("I2C write {=u8:#04x}/{=u8:#04x} failed: {}", address, register, e);
            TransportError::from(e)
        })
    }

    /// [`Transport::read`], retried until success or `window_ms` elapses
    pub async fn read_with_timeout(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        window_ms: u32,
    ) -> Result<(), TransportError> {
        let deadline = self.time.now_ms() + window_ms as u64;
        loop {
            match self.read(address, register, buf).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_transient() => return Err(e),
                Err(_) => {}
            }
            if self.time.now_ms() >= deadline {
                warn!("Timeout (read {=u8:#04x} reg {=u8:#04x})", address, register);
                return Err(TransportError::Timeout);
            }
            self.time.delay_ms(self.config.retry_interval_ms).await;
        }
    }

    /// [`Transport::write`], retried until success or `window_ms` elapses
    pub async fn write_with_timeout(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
        window_ms: u32,
    ) -> Result<(), TransportError> {
        let deadline = self.time.now_ms() + window_ms as u64;
        loop {
            match self.write(address, register, data).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_transient() => return Err(e),
                Err(_) => {}
            }
            if self.time.now_ms() >= deadline {
                warn!("Timeout (write {=u8:#04x} reg {=u8:#04x})", address, register);
                return Err(TransportError::Timeout);
            }
            self.time.delay_ms(self.config.retry_interval_ms).await;
        }
    }

    /// Check whether a peer acknowledges `address`
    ///
    /// Address-only write bounded by the probe timeout. No register is
    /// touched.
    pub async fn probe(&mut self, address: u8) -> bool {
        let timeout_us = self.config.probe_timeout_us;
        self.probe_within(address, timeout_us).await
    }

    /// [`Transport::probe`] with an explicit bound
    pub async fn probe_within(&mut self, address: u8, timeout_us: u32) -> bool {
        match self.handle.bus() {
            Some(bus) => bus.write(address, &[], timeout_us).await.is_ok(),
            None => false,
        }
    }
}

/// Build the `[register, data...]` buffer of a write
fn stage(register: u8, data: &[u8]) -> Result<Vec<u8, STAGING_LEN>, TransportError> {
    let too_large = TransportError::PayloadTooLarge { len: data.len() };
    let mut staging = Vec::new();
    staging.push(register).map_err(|_| too_large)?;
    staging.extend_from_slice(data).map_err(|_| too_large)?;
    Ok(staging)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{self, SimBus, SimTimebase, TransferKind};
    use embassy_futures::block_on;
    use syntonic_hal::I2cConfig;

    const PEER: u8 = 0x60;

    #[test]
    fn test_error_mapping() {
        assert_eq!(TransportError::from(I2cError::Timeout), TransportError::Timeout);
        assert_eq!(TransportError::from(I2cError::Nack), TransportError::NoAck);
        assert_eq!(TransportError::from(I2cError::Bus), TransportError::NoAck);
        assert_eq!(
            TransportError::from(I2cError::ArbitrationLost),
            TransportError::NoAck
        );
    }

    #[test]
    fn test_not_configured_before_init() {
        let mut transport = Transport::new(
            BusHandle::new(SimBus::with_peer(PEER), I2cConfig::default()),
            SimTimebase::new(),
            TransportConfig::default(),
        );
        let mut buf = [0u8; 1];
        assert_eq!(
            block_on(transport.read(PEER, 0, &mut buf)),
            Err(TransportError::NotConfigured)
        );
        assert!(!block_on(transport.probe(PEER)));
        assert!(transport.peripheral().log().is_empty());
    }

    #[test]
    fn test_init_failure_reported() {
        let mut sim = SimBus::with_peer(PEER);
        sim.fail_enable(true);
        let mut transport = Transport::new(
            BusHandle::new(sim, I2cConfig::default()),
            SimTimebase::new(),
            TransportConfig::default(),
        );
        assert_eq!(
            transport.init(),
            Err(TransportError::Config(I2cError::InvalidConfig))
        );
    }

    #[test]
    fn test_write_then_read() {
        let mut transport = sim::transport(SimBus::with_peer(PEER)).unwrap();
        block_on(transport.write(PEER, 0x10, &[0x4F, 0x80])).unwrap();
        assert_eq!(transport.peripheral().registers(0x10, 2), &[0x4F, 0x80]);

        let mut buf = [0u8; 2];
        block_on(transport.read(PEER, 0x10, &mut buf)).unwrap();
        assert_eq!(buf, [0x4F, 0x80]);
    }

    #[test]
    fn test_write_is_one_transfer() {
        let mut transport = sim::transport(SimBus::with_peer(PEER)).unwrap();
        block_on(transport.write(PEER, 0x2A, &[1, 2, 3, 4, 5, 6, 7, 8])).unwrap();
        let log = transport.peripheral().log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, TransferKind::Write { len: 9 });
        assert_eq!(log[0].timeout_us, 2_000);
    }

    #[test]
    fn test_oversized_write_sends_nothing() {
        let mut transport = sim::transport(SimBus::with_peer(PEER)).unwrap();
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert_eq!(
            block_on(transport.write(PEER, 0x2A, &payload)),
            Err(TransportError::PayloadTooLarge { len: 9 })
        );
        assert_eq!(
            block_on(transport.write_with_timeout(PEER, 0x2A, &payload, 20)),
            Err(TransportError::PayloadTooLarge { len: 9 })
        );
        assert!(transport.peripheral().log().is_empty());
    }

    #[test]
    fn test_read_skips_data_phase_after_address_failure() {
        let mut sim = SimBus::with_peer(PEER);
        sim.fail_next(1, I2cError::Nack);
        let mut transport = sim::transport(sim).unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(
            block_on(transport.read(PEER, 0x03, &mut buf)),
            Err(TransportError::NoAck)
        );
        assert_eq!(
            transport.peripheral().log()[0].kind,
            TransferKind::WriteRead {
                write_len: 1,
                read_len: 1,
                read_issued: false
            }
        );
    }

    #[test]
    fn test_read_phase_failure_reported() {
        let mut sim = SimBus::with_peer(PEER);
        sim.fail_next_read_phase(I2cError::Timeout);
        let mut transport = sim::transport(sim).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(
            block_on(transport.read(PEER, 0x03, &mut buf)),
            Err(TransportError::Timeout)
        );
    }

    #[test]
    fn test_retry_recovers_from_transient_nack() {
        let mut sim = SimBus::with_peer(PEER);
        sim.fail_next(3, I2cError::Nack);
        let mut transport = sim::transport(sim).unwrap();

        block_on(transport.write_with_timeout(PEER, 0x03, &[0xFF], 20)).unwrap();
        assert_eq!(transport.peripheral().register(0x03), 0xFF);
        assert_eq!(transport.peripheral().log().len(), 4);
        assert_eq!(transport.time().now_ms(), 6);
    }

    #[test]
    fn test_retry_window_bounds_absent_peer() {
        let mut transport = sim::transport(SimBus::new()).unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(
            block_on(transport.read_with_timeout(PEER, 0x00, &mut buf, 20)),
            Err(TransportError::Timeout)
        );
        // Attempts at 0, 2, .. 20 ms
        assert_eq!(transport.peripheral().log().len(), 11);
        assert_eq!(transport.time().now_ms(), 20);
    }

    #[test]
    fn test_probe_is_address_only() {
        let mut sim = SimBus::with_peer(PEER);
        sim.add_present(0x3C);
        let mut transport = sim::transport(sim).unwrap();

        assert!(block_on(transport.probe(PEER)));
        assert!(block_on(transport.probe(0x3C)));
        assert!(!block_on(transport.probe(0x61)));

        for transfer in transport.peripheral().log() {
            assert_eq!(transfer.kind, TransferKind::Write { len: 0 });
            assert_eq!(transfer.timeout_us, 1_000);
        }
    }

    #[test]
    fn test_reset_reinitializes() {
        let mut transport = sim::transport(SimBus::with_peer(PEER)).unwrap();
        block_on(transport.reset()).unwrap();
        assert_eq!(transport.mode(), PinMode::Peripheral);
        assert_eq!(transport.peripheral().enable_count(), 2);
        assert_eq!(transport.time().now_ms(), 50);
    }

    #[test]
    fn test_recover_restores_transactions() {
        let mut sim = SimBus::with_peer(PEER);
        sim.hold_data_low(5);
        let mut transport = sim::transport(sim).unwrap();

        // Wedged bus times out
        let mut buf = [0u8; 1];
        assert_eq!(
            block_on(transport.read(PEER, 0x00, &mut buf)),
            Err(TransportError::Timeout)
        );

        let report = block_on(transport.recover()).unwrap();
        assert_eq!(report.pulses, 5);
        assert!(report.released);
        assert_eq!(transport.mode(), PinMode::Peripheral);
        block_on(transport.read(PEER, 0x00, &mut buf)).unwrap();
    }
}
