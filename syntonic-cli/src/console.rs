//! Console dispatcher
//!
//! Owns the transport and the Si5351 engine, turns complete lines into
//! commands and writes human-readable replies to any
//! [`embedded_io_async::Write`] sink. Every reply line ends in CRLF.

use core::fmt::{self, Write as _};

use embedded_io_async::Write;
use heapless::String;
use syntonic_core::scanner::{scan_quick, scan_thorough, scan_verified};
use syntonic_core::log::{debug, info, warn};
use syntonic_core::si5351::registers;
use syntonic_core::si5351::{
    BringUp, Channel, ChannelOutcome, ChannelPlan, ClockGen, DeviceStatus, EngineError,
};
use syntonic_core::{Transport, TransportError};
use syntonic_hal::{I2cBus, I2cPeripheral, RecoveryLines, Timebase};

use crate::command::{self, Command, CommandError, ScanMode};
use crate::help::{BANNER, HELP, PROMPT};
use crate::line::LineAssembler;

/// Longest reply line, CRLF excluded
pub const REPLY_LEN: usize = 96;

/// Why boot stopped short of the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootFailure {
    /// The I2C peripheral rejected its configuration
    TransportInit(TransportError),
}

/// Result of the boot sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootOutcome {
    /// Prompt is up, commands may follow
    Ready,
    /// Fatal failure; the caller should stop accepting commands
    Halted(BootFailure),
}

fn render(args: fmt::Arguments<'_>) -> String<REPLY_LEN> {
    let mut line = String::new();
    // Overlong replies are truncated
    let _ = line.write_fmt(args);
    line
}

async fn emit<W: Write>(out: &mut W, text: &str) -> Result<(), W::Error> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\r\n").await
}

/// Write one formatted reply line
macro_rules! say {
    ($out:expr, $($arg:tt)*) => {
        emit($out, &render(format_args!($($arg)*))).await?
    };
}

async fn emit_all<W: Write>(out: &mut W, lines: &[&str]) -> Result<(), W::Error> {
    for line in lines {
        emit(out, line).await?;
    }
    Ok(())
}

fn transport_error_name(error: TransportError) -> &'static str {
    match error {
        TransportError::NoAck => "NACK",
        TransportError::Timeout => "timeout",
        TransportError::PayloadTooLarge { .. } => "payload too large",
        TransportError::NotConfigured => "bus not configured",
        TransportError::Config(_) => "peripheral config rejected",
    }
}

async fn report_engine_error<W: Write>(
    out: &mut W,
    engine: &ClockGen,
    error: EngineError,
) -> Result<(), W::Error> {
    match error {
        EngineError::Bus {
            op,
            register,
            error,
        } => {
            say!(
                out,
                "ERR: I2C {} {} at reg 0x{:02X}",
                op.as_str(),
                transport_error_name(error),
                register
            );
        }
        EngineError::FrequencyTooHigh {
            requested_hz,
            realized_hz,
        } => {
            let max_hz = engine.config().max_output_hz;
            if requested_hz > max_hz {
                say!(out, "Freq too high (>{} MHz)", max_hz / 1_000_000);
            } else {
                // Request is in range but the nearest divider overshoots
                say!(
                    out,
                    "Freq too high (actual {} Hz, >{} MHz)",
                    realized_hz,
                    max_hz / 1_000_000
                );
            }
        }
        EngineError::FrequencyTooLow { requested_hz } => {
            say!(out, "Freq too low ({} Hz)", requested_hz);
        }
        EngineError::UnsupportedPll { xtal_hz, pll_hz } => {
            say!(out, "ERR: PLL {} Hz not reachable from {} Hz", pll_hz, xtal_hz);
        }
    }
    Ok(())
}

async fn report_command_error<W: Write>(out: &mut W, error: CommandError) -> Result<(), W::Error> {
    match error {
        CommandError::Unknown => emit(out, "Unknown command. Type 'help' / 'H' / '?'").await,
        CommandError::Usage(usage) => {
            say!(out, "usage: {}", usage);
            Ok(())
        }
        CommandError::InvalidChannel(channel) => {
            say!(out, "ERR: ch={} (use 0..2)", channel);
            Ok(())
        }
        CommandError::InvalidNumber => emit(out, "ERR: not a number").await,
    }
}

async fn report_plan<W: Write>(
    out: &mut W,
    channel: Channel,
    plan: &ChannelPlan,
) -> Result<(), W::Error> {
    let mhz = plan.requested_hz / 1_000_000;
    if plan.realized_hz == plan.requested_hz {
        say!(
            out,
            "CLK{} = {} MHz (div={})",
            channel.index(),
            mhz,
            plan.divider.get()
        );
    } else {
        say!(
            out,
            "CLK{} = {} MHz (div={}, actual {} Hz)",
            channel.index(),
            mhz,
            plan.divider.get(),
            plan.realized_hz
        );
    }
    Ok(())
}

async fn report_status<W: Write>(out: &mut W, status: &DeviceStatus) -> Result<(), W::Error> {
    say!(
        out,
        "Status: 0x{:02X} (rev {}, {}, PLLA {})",
        status.device_status,
        status.revision(),
        if status.initializing() { "initializing" } else { "ready" },
        if status.pll_a_locked() { "locked" } else { "unlocked" }
    );
    say!(out, "OE: 0x{:02X}", status.output_enable);

    for channel in &status.channels {
        let index = channel.channel.index();
        let state = if channel.output_enabled { "on" } else { "off" };
        if channel.control.is_powered_down() {
            say!(out, "CLK{}: {} (powered down)", index, state);
            continue;
        }
        match (channel.divider, channel.output_hz) {
            (Some(divider), Some(hz)) => say!(
                out,
                "CLK{}: {} {} Hz (div={}, ctrl=0x{:02X})",
                index,
                state,
                hz,
                divider.get(),
                channel.control.bits()
            ),
            _ => say!(
                out,
                "CLK{}: {} (ctrl=0x{:02X}, fractional or PLLB)",
                index,
                state,
                channel.control.bits()
            ),
        }
    }
    Ok(())
}

/// Text console over one Si5351
pub struct Console<P, T> {
    transport: Transport<P, T>,
    engine: ClockGen,
    lines: LineAssembler,
}

impl<P, T> Console<P, T>
where
    P: I2cBus + I2cPeripheral + RecoveryLines,
    T: Timebase,
{
    /// Wrap a transport and engine; nothing is touched until [`Console::boot`]
    pub fn new(transport: Transport<P, T>, engine: ClockGen) -> Self {
        Self {
            transport,
            engine,
            lines: LineAssembler::new(),
        }
    }

    pub fn transport(&self) -> &Transport<P, T> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<P, T> {
        &mut self.transport
    }

    pub fn engine(&self) -> &ClockGen {
        &self.engine
    }

    /// Print the banner
    pub async fn banner<W: Write>(&mut self, out: &mut W) -> Result<(), W::Error> {
        emit_all(out, BANNER).await
    }

    /// Print the prompt on a fresh line
    pub async fn prompt<W: Write>(&mut self, out: &mut W) -> Result<(), W::Error> {
        out.write_all(b"\r\n").await?;
        out.write_all(PROMPT.as_bytes()).await
    }

    /// Bring the bus and the chip up, reporting each step
    ///
    /// Clears a stuck bus, configures the peripheral, pings the chip, lists
    /// the bus with a strict scan and runs the full bring-up. Only a rejected
    /// peripheral configuration halts. A silent chip skips the bring-up and
    /// a failed bring-up is reported; either way the prompt comes up so the
    /// bus can be recovered and rescanned.
    pub async fn boot<W: Write>(&mut self, out: &mut W) -> Result<BootOutcome, W::Error> {
        self.banner(out).await?;

        emit(out, "[BOOT] I2C bus clear...").await?;
        let report = self.transport.clear_bus().await;
        if report.released {
            debug!("Boot bus clear: {} pulses", report.pulses);
        } else {
            say!(out, "[BUS] SDA still low after {} pulses", report.pulses);
        }

        emit(out, "[BOOT] I2C init...").await?;
        if let Err(error) = self.transport.init() {
            warn!("I2C init failed: {}", error);
            say!(out, "[ERROR] I2C init failed ({})", transport_error_name(error));
            return Ok(BootOutcome::Halted(BootFailure::TransportInit(error)));
        }
        let bus = *self.transport.handle().config();
        say!(
            out,
            "[INFO] I2C initialized: SDA={}, SCL={}, speed={} Hz",
            bus.sda_pin,
            bus.scl_pin,
            bus.frequency
        );

        let address = self.engine.address();
        say!(out, "[BOOT] Pinging Si5351A @0x{:02X}...", address);
        if !self.engine.ping(&mut self.transport).await {
            say!(out, "[PING] 0x{:02X} NACK/Timeout", address);
            emit(out, "[ERR]  Si5351A not responding.").await?;
            warn!("No Si5351 at {=u8:#04x}, bring-up skipped", address);
            self.prompt(out).await?;
            return Ok(BootOutcome::Ready);
        }
        say!(out, "[PING] 0x{:02X} ACK", address);

        emit(out, "[BOOT] I2C strict scan...").await?;
        self.scan(ScanMode::Strict, out).await?;

        emit(out, "[BOOT] init PLLA...").await?;
        match self
            .engine
            .initialize_device(&mut self.transport, BringUp::Full)
            .await
        {
            Ok(()) => {
                say!(
                    out,
                    "Si5351A initialized (PLLA={} MHz)",
                    self.engine.config().pll_hz / 1_000_000
                );
                if let Ok(plan) = self.engine.plan(self.engine.config().default_hz) {
                    report_plan(out, Channel::Clk0, &plan).await?;
                }
                emit(out, "CLK1 disabled").await?;
                emit(out, "CLK2 disabled").await?;
            }
            Err(error) => {
                warn!("Bring-up failed: {}", error);
                report_engine_error(out, &self.engine, error).await?;
            }
        }

        info!("Console ready");
        self.prompt(out).await?;
        Ok(BootOutcome::Ready)
    }

    /// Feed received bytes, executing every line they complete
    pub async fn feed<W: Write>(&mut self, bytes: &[u8], out: &mut W) -> Result<(), W::Error> {
        for &byte in bytes {
            if let Some(line) = self.lines.feed(byte) {
                self.run_line(&line, out).await?;
                self.prompt(out).await?;
            }
        }
        Ok(())
    }

    /// Parse and execute one line; blank lines do nothing
    pub async fn run_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<(), W::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        match command::parse(line) {
            Ok(command) => self.execute(command, out).await,
            Err(error) => {
                debug!("Rejected line: {}", error);
                report_command_error(out, error).await
            }
        }
    }

    /// Execute a parsed command
    pub async fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<(), W::Error> {
        debug!("Command: {}", command);
        match command {
            Command::Help => emit_all(out, HELP).await?,
            Command::Scan(mode) => self.scan(mode, out).await?,
            Command::Ping => {
                let address = self.engine.address();
                if self.engine.ping(&mut self.transport).await {
                    say!(out, "[PING] 0x{:02X} ACK", address);
                } else {
                    say!(out, "[PING] 0x{:02X} NACK/Timeout", address);
                }
            }
            Command::Whoami => match self.engine.whoami(&mut self.transport).await {
                Ok(id) => say!(out, "Reg0:0x{:02X}, Reg1:0x{:02X}", id.reg0, id.reg1),
                Err(error) => report_engine_error(out, &self.engine, error).await?,
            },
            Command::Status => match self.engine.status(&mut self.transport).await {
                Ok(status) => report_status(out, &status).await?,
                Err(error) => report_engine_error(out, &self.engine, error).await?,
            },
            Command::Init => {
                match self
                    .engine
                    .initialize_device(&mut self.transport, BringUp::Basic)
                    .await
                {
                    Ok(()) => say!(
                        out,
                        "Si5351A initialized (PLLA={} MHz)",
                        self.engine.config().pll_hz / 1_000_000
                    ),
                    Err(error) => report_engine_error(out, &self.engine, error).await?,
                }
            }
            Command::OutputEnable(on) => {
                match self.engine.set_all_outputs(&mut self.transport, on).await {
                    Ok(()) if on => emit(out, "OE: ON (all enabled)").await?,
                    Ok(()) => emit(out, "OE: OFF (all disabled)").await?,
                    Err(error) => report_engine_error(out, &self.engine, error).await?,
                }
            }
            Command::SetChannel { channel, mhz } => {
                let hz = mhz.saturating_mul(1_000_000);
                match self.engine.set_channel(&mut self.transport, channel, hz).await {
                    Ok(ChannelOutcome::Enabled(plan)) => report_plan(out, channel, &plan).await?,
                    Ok(ChannelOutcome::Disabled { .. }) => {
                        say!(out, "CLK{} disabled", channel.index())
                    }
                    Err(error) => report_engine_error(out, &self.engine, error).await?,
                }
            }
            Command::Peek { register } => {
                match self.engine.peek(&mut self.transport, register).await {
                    Ok(value) => match registers::lookup(register) {
                        Some(info) => say!(
                            out,
                            "reg 0x{:02X} ({}) = 0x{:02X}",
                            register,
                            info.name,
                            value
                        ),
                        None => say!(out, "reg 0x{:02X} = 0x{:02X}", register, value),
                    },
                    Err(error) => report_engine_error(out, &self.engine, error).await?,
                }
            }
            Command::Poke { register, value } => {
                match self.engine.poke(&mut self.transport, register, value).await {
                    Ok(()) => say!(out, "reg 0x{:02X} <- 0x{:02X}", register, value),
                    Err(error) => report_engine_error(out, &self.engine, error).await?,
                }
            }
            Command::Reset => match self.transport.reset().await {
                Ok(()) => emit(out, "I2C reset").await?,
                Err(error) => {
                    say!(out, "ERR: I2C init failed ({})", transport_error_name(error))
                }
            },
            Command::Recover => match self.transport.recover().await {
                Ok(report) if report.released => say!(
                    out,
                    "[BUS] SDA released after {} pulses",
                    report.pulses
                ),
                Ok(report) => say!(
                    out,
                    "[BUS] SDA still low after {} pulses",
                    report.pulses
                ),
                Err(error) => {
                    say!(out, "ERR: I2C init failed ({})", transport_error_name(error))
                }
            },
        }
        Ok(())
    }

    async fn scan<W: Write>(&mut self, mode: ScanMode, out: &mut W) -> Result<(), W::Error> {
        match mode {
            ScanMode::Quick => match scan_quick(&mut self.transport).await {
                Some(address) => say!(out, "Found I2C device at 0x{:02X}", address.get()),
                None => emit(out, "No I2C devices found.").await?,
            },
            ScanMode::Thorough => {
                emit(out, "Scanning I2C devices...").await?;
                let report = scan_thorough(&mut self.transport).await;
                for address in report.addresses() {
                    say!(out, "  Found device at 0x{:02X}", address.get());
                }
                if report.is_empty() {
                    emit(out, "No I2C devices found.").await?;
                }
            }
            ScanMode::Strict => {
                emit(out, "[SCAN] strict 7-bit scan (write reg=0 + read 1B)...").await?;
                let report = scan_verified(&mut self.transport).await;
                for peer in report.peers() {
                    say!(
                        out,
                        "  - found 0x{:02X} (val=0x{:02X})",
                        peer.address.get(),
                        peer.register0
                    );
                }
                if report.is_empty() {
                    emit(out, "[SCAN] none").await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use std::string::String as StdString;
    use std::vec::Vec;
    use syntonic_core::si5351::EngineConfig;
    use syntonic_core::sim::{SimBus, SimTimebase};
    use syntonic_core::{BusHandle, TransportConfig};
    use syntonic_hal::{I2cConfig, I2cError};

    const PEER: u8 = 0x60;

    /// Collects everything the console writes
    #[derive(Default)]
    struct Sink(Vec<u8>);

    impl embedded_io_async::ErrorType for Sink {
        type Error = Infallible;
    }

    impl Write for Sink {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    impl Sink {
        fn text(&self) -> StdString {
            StdString::from_utf8(self.0.clone()).unwrap()
        }

        fn take(&mut self) -> StdString {
            let text = self.text();
            self.0.clear();
            text
        }
    }

    fn console(sim: SimBus) -> Console<SimBus, SimTimebase> {
        let transport = Transport::new(
            BusHandle::new(sim, I2cConfig::default()),
            SimTimebase::new(),
            TransportConfig::default(),
        );
        Console::new(transport, ClockGen::new(EngineConfig::default()).unwrap())
    }

    fn booted() -> (Console<SimBus, SimTimebase>, Sink) {
        let mut console = console(SimBus::with_peer(PEER));
        let mut sink = Sink::default();
        let outcome = block_on(console.boot(&mut sink)).unwrap();
        assert_eq!(outcome, BootOutcome::Ready);
        sink.0.clear();
        (console, sink)
    }

    fn run(console: &mut Console<SimBus, SimTimebase>, sink: &mut Sink, line: &str) -> StdString {
        block_on(console.run_line(line, sink)).unwrap();
        sink.take()
    }

    #[test]
    fn test_boot_brings_up_clk0() {
        let mut console = console(SimBus::with_peer(PEER));
        let mut sink = Sink::default();
        let outcome = block_on(console.boot(&mut sink)).unwrap();
        assert_eq!(outcome, BootOutcome::Ready);

        let text = sink.text();
        assert!(text.contains("[INFO] I2C initialized: SDA=6, SCL=7, speed=100000 Hz"));
        assert!(text.contains("[PING] 0x60 ACK"));
        assert!(text.contains("  - found 0x60 (val=0x00)"));
        assert!(text.contains("Si5351A initialized (PLLA=800 MHz)"));
        assert!(text.contains("CLK0 = 10 MHz (div=80)"));
        assert!(text.ends_with("\r\n> "));

        let sim = console.transport().peripheral();
        assert_eq!(sim.register(registers::OUTPUT_ENABLE), 0xFE);
        assert_eq!(sim.register(registers::CLK1_CONTROL), 0x80);
    }

    #[test]
    fn test_boot_without_peer_reaches_prompt() {
        let mut console = console(SimBus::new());
        let mut sink = Sink::default();
        let outcome = block_on(console.boot(&mut sink)).unwrap();
        assert_eq!(outcome, BootOutcome::Ready);

        let text = sink.text();
        assert!(text.contains("[PING] 0x60 NACK/Timeout"));
        assert!(!text.contains("[BOOT] init PLLA..."));
        assert!(text.ends_with("\r\n> "));

        // Still usable for diagnosis
        sink.0.clear();
        assert_eq!(run(&mut console, &mut sink, "scan"), "No I2C devices found.\r\n");
    }

    #[test]
    fn test_boot_halts_on_rejected_config() {
        let mut sim = SimBus::with_peer(PEER);
        sim.fail_enable(true);
        let mut console = console(sim);
        let mut sink = Sink::default();
        let outcome = block_on(console.boot(&mut sink)).unwrap();
        assert_eq!(
            outcome,
            BootOutcome::Halted(BootFailure::TransportInit(TransportError::Config(
                I2cError::InvalidConfig
            )))
        );
        assert!(sink.text().contains("[ERROR] I2C init failed"));
    }

    #[test]
    fn test_boot_clears_stuck_bus() {
        let mut sim = SimBus::with_peer(PEER);
        sim.hold_data_low(3);
        let mut console = console(sim);
        let mut sink = Sink::default();
        let outcome = block_on(console.boot(&mut sink)).unwrap();
        assert_eq!(outcome, BootOutcome::Ready);
        assert!(!sink.text().contains("SDA still low"));
    }

    #[test]
    fn test_boot_reports_bus_held_low() {
        let mut sim = SimBus::with_peer(PEER);
        sim.hold_data_low_forever();
        let mut console = console(sim);
        let mut sink = Sink::default();
        let outcome = block_on(console.boot(&mut sink)).unwrap();
        assert!(sink.text().contains("[BUS] SDA still low after 9 pulses"));
        assert!(sink.text().contains("[PING] 0x60 NACK/Timeout"));
        assert_eq!(outcome, BootOutcome::Ready);
        assert!(sink.text().ends_with("\r\n> "));
    }

    #[test]
    fn test_peek_after_boot() {
        let (mut console, mut sink) = booted();
        assert_eq!(run(&mut console, &mut sink, "peek 03"), "reg 0x03 (oe) = 0xFE\r\n");
        assert_eq!(run(&mut console, &mut sink, "PEEK oe"), "reg 0x03 (oe) = 0xFE\r\n");
        assert_eq!(run(&mut console, &mut sink, "peek 0xb0"), "reg 0xB0 = 0x00\r\n");
    }

    #[test]
    fn test_poke_writes_register() {
        let (mut console, mut sink) = booted();
        assert_eq!(run(&mut console, &mut sink, "poke xtal 52"), "reg 0xB7 <- 0x52\r\n");
        assert_eq!(console.transport().peripheral().register(registers::CRYSTAL_LOAD), 0x52);
    }

    #[test]
    fn test_clk_command_sets_divider() {
        let (mut console, mut sink) = booted();
        assert_eq!(run(&mut console, &mut sink, "clk 1 20"), "CLK1 = 20 MHz (div=40)\r\n");
        assert_eq!(run(&mut console, &mut sink, "ch2=50"), "CLK2 = 50 MHz (div=16)\r\n");
        let sim = console.transport().peripheral();
        assert_eq!(sim.register(registers::OUTPUT_ENABLE), 0xF8);
    }

    #[test]
    fn test_inexact_frequency_reports_actual() {
        let (mut console, mut sink) = booted();
        let reply = run(&mut console, &mut sink, "freq 3");
        assert!(reply.starts_with("CLK0 = 3 MHz (div=267, actual "));
    }

    #[test]
    fn test_zero_disables_channel() {
        let (mut console, mut sink) = booted();
        assert_eq!(run(&mut console, &mut sink, "clk0=0"), "CLK0 disabled\r\n");
        assert_eq!(
            console.transport().peripheral().register(registers::OUTPUT_ENABLE),
            0xFF
        );
    }

    #[test]
    fn test_too_high_leaves_chip_untouched() {
        let (mut console, mut sink) = booted();
        let before = console.transport().peripheral().snapshot();
        assert_eq!(
            run(&mut console, &mut sink, "freq 146"),
            "Freq too high (actual 160000000 Hz, >150 MHz)\r\n"
        );
        assert_eq!(run(&mut console, &mut sink, "freq 200"), "Freq too high (>150 MHz)\r\n");
        assert_eq!(console.transport().peripheral().snapshot(), before);
    }

    #[test]
    fn test_parse_errors_reported() {
        let (mut console, mut sink) = booted();
        assert_eq!(
            run(&mut console, &mut sink, "bogus"),
            "Unknown command. Type 'help' / 'H' / '?'\r\n"
        );
        assert_eq!(run(&mut console, &mut sink, "clk3=5"), "ERR: ch=3 (use 0..2)\r\n");
        assert_eq!(run(&mut console, &mut sink, "oe"), "usage: oe on|off\r\n");
        assert_eq!(run(&mut console, &mut sink, "   "), "");
    }

    #[test]
    fn test_output_enable_all() {
        let (mut console, mut sink) = booted();
        assert_eq!(run(&mut console, &mut sink, "oe on"), "OE: ON (all enabled)\r\n");
        assert_eq!(console.transport().peripheral().register(registers::OUTPUT_ENABLE), 0x00);
        assert_eq!(run(&mut console, &mut sink, "oe off"), "OE: OFF (all disabled)\r\n");
        assert_eq!(console.transport().peripheral().register(registers::OUTPUT_ENABLE), 0xFF);
    }

    #[test]
    fn test_whoami_reads_two_registers() {
        let (mut console, mut sink) = booted();
        console.transport_mut().peripheral_mut().set_register(0, 0x11);
        console.transport_mut().peripheral_mut().set_register(1, 0x22);
        assert_eq!(run(&mut console, &mut sink, "whoami"), "Reg0:0x11, Reg1:0x22\r\n");
    }

    #[test]
    fn test_status_reflects_channels() {
        let (mut console, mut sink) = booted();
        let reply = run(&mut console, &mut sink, "status");
        assert!(reply.contains("Status: 0x00 (rev 0, ready, PLLA locked)"));
        assert!(reply.contains("OE: 0xFE"));
        assert!(reply.contains("CLK0: on 10000000 Hz (div=80, ctrl=0x4F)"));
        assert!(reply.contains("CLK1: off (powered down)"));
        assert!(reply.contains("CLK2: off (powered down)"));
    }

    #[test]
    fn test_scan_modes() {
        let (mut console, mut sink) = booted();
        console.transport_mut().peripheral_mut().add_present(0x3C);

        assert_eq!(run(&mut console, &mut sink, "scan"), "Found I2C device at 0x3C\r\n");

        let reply = run(&mut console, &mut sink, "scan all");
        assert!(reply.starts_with("Scanning I2C devices...\r\n"));
        assert!(reply.contains("  Found device at 0x3C\r\n  Found device at 0x60\r\n"));

        let reply = run(&mut console, &mut sink, "scan strict");
        assert!(reply.contains("  - found 0x3C (val=0x00)"));
        assert!(reply.contains("  - found 0x60"));
    }

    #[test]
    fn test_scan_reports_empty_bus() {
        let (mut console, mut sink) = booted();
        console.transport_mut().peripheral_mut().remove_peer();
        assert_eq!(run(&mut console, &mut sink, "scan"), "No I2C devices found.\r\n");
        assert!(run(&mut console, &mut sink, "scan strict").ends_with("[SCAN] none\r\n"));
    }

    #[test]
    fn test_init_failure_names_register() {
        let (mut console, mut sink) = booted();
        console
            .transport_mut()
            .peripheral_mut()
            .fail_next(u8::MAX, I2cError::Nack);
        assert_eq!(
            run(&mut console, &mut sink, "init"),
            "ERR: I2C write timeout at reg 0x03\r\n"
        );
    }

    #[test]
    fn test_peek_without_peer() {
        let (mut console, mut sink) = booted();
        console.transport_mut().peripheral_mut().remove_peer();
        assert_eq!(
            run(&mut console, &mut sink, "peek 00"),
            "ERR: I2C read NACK at reg 0x00\r\n"
        );
    }

    #[test]
    fn test_recover_and_reset() {
        let (mut console, mut sink) = booted();
        assert_eq!(
            run(&mut console, &mut sink, "recover"),
            "[BUS] SDA released after 1 pulses\r\n"
        );
        assert!(console.transport().peripheral().peripheral_enabled());
        assert_eq!(run(&mut console, &mut sink, "reset"), "I2C reset\r\n");
        assert_eq!(run(&mut console, &mut sink, "ping"), "[PING] 0x60 ACK\r\n");
    }

    #[test]
    fn test_feed_assembles_lines() {
        let (mut console, mut sink) = booted();
        block_on(console.feed(b"pi", &mut sink)).unwrap();
        assert!(sink.text().is_empty());
        block_on(console.feed(b"ng\r\n", &mut sink)).unwrap();
        assert_eq!(sink.take(), "[PING] 0x60 ACK\r\n\r\n> ");
    }

    #[test]
    fn test_help_lists_commands() {
        let (mut console, mut sink) = booted();
        let reply = run(&mut console, &mut sink, "?");
        assert!(reply.contains("HELP MENU"));
        assert!(reply.contains("clk <ch> <MHz>"));
        assert!(reply.contains("oe on|off"));
    }
}
