//! I2C address scanner
//!
//! Sweeps the non-reserved 7-bit range [`SCAN_START`]..=[`SCAN_END`] with the
//! single-attempt transport primitives. Addresses below 0x08 (general call,
//! CBUS, reserved) and above 0x77 (10-bit prefix, reserved) are never touched.

use heapless::Vec;
use syntonic_hal::{I2cBus, I2cPeripheral, RecoveryLines, Timebase};

use crate::log::{debug, info};
use crate::transport::Transport;

/// First address probed
pub const SCAN_START: u8 = 0x08;

/// Last address probed
pub const SCAN_END: u8 = 0x77;

/// Number of addresses in the scan range
pub const SCAN_LEN: usize = (SCAN_END - SCAN_START) as usize + 1;

/// A 7-bit address inside the scan range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress(u8);

impl PeerAddress {
    /// Wrap `raw` if it lies in the scan range
    pub const fn new(raw: u8) -> Option<Self> {
        if raw >= SCAN_START && raw <= SCAN_END {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// The raw 7-bit address
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every address in scan order
    pub fn all() -> impl Iterator<Item = PeerAddress> {
        (SCAN_START..=SCAN_END).map(PeerAddress)
    }
}

impl TryFrom<u8> for PeerAddress {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        PeerAddress::new(raw).ok_or(raw)
    }
}

impl From<PeerAddress> for u8 {
    fn from(address: PeerAddress) -> u8 {
        address.0
    }
}

/// Addresses that answered a thorough scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    found: Vec<PeerAddress, SCAN_LEN>,
}

impl ScanReport {
    /// Number of peers found
    pub fn count(&self) -> usize {
        self.found.len()
    }

    /// Whether nothing answered
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Peers in address order
    pub fn addresses(&self) -> &[PeerAddress] {
        &self.found
    }
}

/// A peer that answered a register-0 read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VerifiedPeer {
    pub address: PeerAddress,
    /// Value of register 0
    pub register0: u8,
}

/// Peers that completed a register-0 read during a verified scan
#[derive(Debug, Clone, Default)]
pub struct VerifiedReport {
    found: Vec<VerifiedPeer, SCAN_LEN>,
}

impl VerifiedReport {
    /// Number of peers found
    pub fn count(&self) -> usize {
        self.found.len()
    }

    /// Whether nothing answered
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Peers in address order
    pub fn peers(&self) -> &[VerifiedPeer] {
        &self.found
    }
}

/// Probe every address in the range and collect the ones that acknowledge
pub async fn scan_thorough<P, T>(transport: &mut Transport<P, T>) -> ScanReport
where
    P: I2cBus + I2cPeripheral + RecoveryLines,
    T: Timebase,
{
    let mut report = ScanReport::default();
    for address in PeerAddress::all() {
        if transport.probe(address.get()).await {
            info!("I2C device at {=u8:#04x}", address.get());
            // Capacity equals the range size
            let _ = report.found.push(address);
        }
    }
    if report.is_empty() {
        info!("No I2C devices found");
    }
    report
}

/// Probe the range in order and stop at the first address that acknowledges
///
/// Issues exactly as many probes as the position of the first present peer
/// in the range, or the full range when nothing answers.
pub async fn scan_quick<P, T>(transport: &mut Transport<P, T>) -> Option<PeerAddress>
where
    P: I2cBus + I2cPeripheral + RecoveryLines,
    T: Timebase,
{
    for address in PeerAddress::all() {
        if transport.probe(address.get()).await {
            debug!("First I2C device at {=u8:#04x}", address.get());
            return Some(address);
        }
    }
    None
}

/// Read register 0 of every address and keep the ones that complete
///
/// Stricter than a probe: the peer has to accept a register address and
/// return a data byte, which filters out lines that merely pull ACK low.
pub async fn scan_verified<P, T>(transport: &mut Transport<P, T>) -> VerifiedReport
where
    P: I2cBus + I2cPeripheral + RecoveryLines,
    T: Timebase,
{
    let mut report = VerifiedReport::default();
    for address in PeerAddress::all() {
        let mut buf = [0u8; 1];
        if transport.read(address.get(), 0x00, &mut buf).await.is_ok() {
            info!("I2C device at {=u8:#04x} (reg0={=u8:#04x})", address.get(), buf[0]);
            let _ = report.found.push(VerifiedPeer {
                address,
                register0: buf[0],
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{self, SimBus, TransferKind};
    use embassy_futures::block_on;
    use proptest::prelude::*;

    #[test]
    fn test_peer_address_range() {
        assert!(PeerAddress::new(0x07).is_none());
        assert_eq!(PeerAddress::new(0x08).map(PeerAddress::get), Some(0x08));
        assert_eq!(PeerAddress::new(0x77).map(PeerAddress::get), Some(0x77));
        assert!(PeerAddress::new(0x78).is_none());
        assert_eq!(PeerAddress::try_from(0x00), Err(0x00));
        assert_eq!(PeerAddress::all().count(), SCAN_LEN);
        assert_eq!(SCAN_LEN, 112);
    }

    #[test]
    fn test_thorough_finds_all() {
        let mut sim = SimBus::with_peer(0x60);
        sim.add_present(0x3C);
        sim.add_present(0x50);
        let mut transport = sim::transport(sim).unwrap();

        let report = block_on(scan_thorough(&mut transport));
        let raw: heapless::Vec<u8, 4> = report.addresses().iter().map(|a| a.get()).collect();
        assert_eq!(raw.as_slice(), &[0x3C, 0x50, 0x60]);
        assert_eq!(transport.peripheral().log().len(), SCAN_LEN);
    }

    #[test]
    fn test_thorough_empty_bus() {
        let mut transport = sim::transport(SimBus::new()).unwrap();
        let report = block_on(scan_thorough(&mut transport));
        assert!(report.is_empty());
        assert_eq!(report.count(), 0);
    }

    #[test]
    fn test_quick_stops_at_first_hit() {
        let mut sim = SimBus::with_peer(0x60);
        sim.add_present(0x70);
        let mut transport = sim::transport(sim).unwrap();

        let found = block_on(scan_quick(&mut transport));
        assert_eq!(found.map(PeerAddress::get), Some(0x60));
        assert_eq!(transport.peripheral().log().len(), (0x60 - SCAN_START + 1) as usize);
    }

    #[test]
    fn test_quick_nothing_found() {
        let mut transport = sim::transport(SimBus::new()).unwrap();
        assert_eq!(block_on(scan_quick(&mut transport)), None);
        assert_eq!(transport.peripheral().log().len(), SCAN_LEN);
    }

    #[test]
    fn test_verified_reads_register_zero() {
        let mut sim = SimBus::with_peer(0x60);
        sim.set_register(0x00, 0x11);
        sim.add_present(0x3C);
        let mut transport = sim::transport(sim).unwrap();

        let report = block_on(scan_verified(&mut transport));
        assert_eq!(report.count(), 2);
        assert_eq!(report.peers()[0].address.get(), 0x3C);
        assert_eq!(report.peers()[0].register0, 0x00);
        assert_eq!(
            report.peers()[1],
            VerifiedPeer {
                address: PeerAddress(0x60),
                register0: 0x11,
            }
        );
        for transfer in transport.peripheral().log() {
            assert!(matches!(
                transfer.kind,
                TransferKind::WriteRead {
                    write_len: 1,
                    read_len: 1,
                    ..
                }
            ));
        }
    }

    proptest! {
        #[test]
        fn prop_never_probes_reserved(present in prop::collection::vec(0u8..0x80, 0..16)) {
            let mut sim = SimBus::new();
            for &address in &present {
                sim.add_present(address);
            }
            let mut transport = sim::transport(sim).unwrap();

            let report = block_on(scan_thorough(&mut transport));
            let _ = block_on(scan_quick(&mut transport));
            let _ = block_on(scan_verified(&mut transport));

            for transfer in transport.peripheral().log() {
                prop_assert!((SCAN_START..=SCAN_END).contains(&transfer.address));
            }

            let expected = (SCAN_START..=SCAN_END)
                .filter(|a| present.contains(a))
                .count();
            prop_assert_eq!(report.count(), expected);
        }

        #[test]
        fn prop_quick_probe_count(first in SCAN_START..=SCAN_END) {
            let mut sim = SimBus::new();
            sim.add_present(first);
            let mut transport = sim::transport(sim).unwrap();

            let found = block_on(scan_quick(&mut transport));
            prop_assert_eq!(found.map(PeerAddress::get), Some(first));
            let log = transport.peripheral().log();
            prop_assert_eq!(log.len(), (first - SCAN_START + 1) as usize);
            for transfer in log {
                prop_assert!(transfer.timeout_us <= transport.config().probe_timeout_us);
            }
        }
    }
}
