//! Syntonic - Si5351 Clock Generator Console Firmware
//!
//! Firmware for a Seeed XIAO RP2040 driving an Si5351A over I2C. The host
//! talks to it through a USB CDC-ACM serial port: bus scans, register
//! peek/poke and per-channel frequency control.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::InterruptHandler as I2cInterruptHandler;
use embassy_rp::peripherals::{I2C1, PIN_6, PIN_7, USB};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use syntonic_cli::Console;
use syntonic_core::config::{parse_config, BoardConfig};
use syntonic_core::si5351::ClockGen;
use syntonic_core::{BusHandle, Transport};
use syntonic_hal_rp2040::{EmbassyTimebase, Rp2040I2c};

mod serial;
mod tasks;

/// Embedded board configuration (compiled into firmware)
/// Edit board.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../board.toml");

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
    I2C1_IRQ => I2cInterruptHandler<I2C1>;
});

/// I2C1 on the XIAO header pins D4 (GPIO6, SDA) and D5 (GPIO7, SCL)
pub type BoardI2c = Rp2040I2c<I2C1, PIN_7, PIN_6, Irqs>;

/// Console over the board bus
pub type BoardConsole = Console<BoardI2c, EmbassyTimebase>;

/// USB CDC-ACM class on the RP2040 USB block
pub type SerialClass = CdcAcmClass<'static, Driver<'static, USB>>;

// USB descriptor and control buffers (must live forever)
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Syntonic firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // User LED (GPIO25, active low), blinking once the console boots
    let led = Output::new(p.PIN_25, Level::High);

    // USB CDC-ACM serial port
    let driver = Driver::new(p.USB, Irqs);
    let mut usb_config = UsbConfig::new(0x2e8a, 0x000a);
    usb_config.manufacturer = Some("Syntonic");
    usb_config.product = Some("Si5351 console");
    usb_config.serial_number = Some("SYNTONIC-0001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );
    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), 64);
    let usb = builder.build();
    info!("USB CDC-ACM initialized");

    // I2C1 is built on the first transport init; until then the pins idle
    let i2c = Rp2040I2c::new(p.I2C1, p.PIN_7, p.PIN_6, Irqs);
    let transport = Transport::new(
        BusHandle::new(i2c, config.i2c.hal_config()),
        EmbassyTimebase::new(),
        config.transport,
    );
    let engine = match ClockGen::new(config.si5351) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Si5351 config rejected: {}, using defaults", e);
            ClockGen::default()
        }
    };
    let console = Console::new(transport, engine);

    // Spawn tasks
    spawner.spawn(tasks::led_task(led)).unwrap();
    spawner.spawn(tasks::usb_task(usb)).unwrap();
    spawner
        .spawn(tasks::console_task(class, console, config.console.led_blink_ms))
        .unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded board configuration
///
/// board.toml is validated by build.rs, so a parse failure here means the
/// two parsers disagree; fall back to the built-in defaults.
fn load_config() -> BoardConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!(
                "Board config: I2C {} Hz, Si5351 @0x{:02x}, PLLA {} Hz",
                config.i2c.speed_hz, config.si5351.address, config.si5351.pll_hz
            );
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {}", e);
            error!("Using default configuration");
            BoardConfig::default()
        }
    }
}
