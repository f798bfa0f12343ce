//! Console task
//!
//! Waits for the host to open the serial port, runs the boot sequence once,
//! then feeds received bytes to the console until the host goes away. A
//! reconnect gets a fresh prompt; the chip is not brought up again.

use defmt::*;
use embassy_time::Timer;
use syntonic_cli::BootOutcome;

use super::led::{FAULT_BLINK_MS, LED_BLINK};
use crate::serial::SerialOut;
use crate::{BoardConsole, SerialClass};

/// Poll interval while waiting for the host to assert DTR
const DTR_POLL_MS: u64 = 10;

/// Console task - owns the serial class and the console
#[embassy_executor::task]
pub async fn console_task(mut class: SerialClass, mut console: BoardConsole, blink_ms: u32) {
    info!("Console task started");
    let mut booted = false;

    loop {
        class.wait_connection().await;
        while !class.dtr() {
            Timer::after_millis(DTR_POLL_MS).await;
        }
        info!("USB host opened the port");

        let ready = if booted {
            console.prompt(&mut SerialOut::new(&mut class)).await.is_ok()
        } else {
            LED_BLINK.signal(blink_ms);
            match console.boot(&mut SerialOut::new(&mut class)).await {
                Ok(BootOutcome::Ready) => {
                    booted = true;
                    true
                }
                Ok(BootOutcome::Halted(failure)) => {
                    error!("Boot halted: {}", failure);
                    LED_BLINK.signal(FAULT_BLINK_MS);
                    halt().await
                }
                Err(_) => false,
            }
        };

        if ready {
            serve(&mut class, &mut console).await;
        }
        info!("USB host disconnected");
    }
}

/// Feed packets to the console until the port goes away
async fn serve(class: &mut SerialClass, console: &mut BoardConsole) {
    let mut packet = [0u8; 64];
    loop {
        let len = match class.read_packet(&mut packet).await {
            Ok(len) => len,
            Err(_) => return,
        };
        if console
            .feed(&packet[..len], &mut SerialOut::new(class))
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Idle forever; only a reset leaves this state
async fn halt() -> ! {
    loop {
        Timer::after_secs(60).await;
    }
}
